//! Mock Graph objects and role assignments

use super::MockAzureClient;
use crate::error::AzureError;
use crate::ids;
use crate::models::*;
use serde_json::Value;

pub(crate) fn application_key(object_id: &str) -> String {
    format!("graph/applications/{object_id}")
}

pub(crate) fn service_principal_key(object_id: &str) -> String {
    format!("graph/servicePrincipals/{object_id}")
}

impl MockAzureClient {
    /// GUID-shaped identifier, unique per mock
    pub(crate) fn new_guid(&self) -> String {
        let n = self.next_id();
        format!("{n:08x}-0000-4000-8000-{n:012x}")
    }

    /// All stored applications
    pub fn applications(&self) -> Vec<Application> {
        self.objects_with_prefix("graph/applications/")
    }

    /// All stored service principals
    pub fn service_principals(&self) -> Vec<ServicePrincipal> {
        self.objects_with_prefix("graph/serviceprincipals/")
    }

    fn objects_with_prefix<T: serde::de::DeserializeOwned>(&self, prefix: &str) -> Vec<T> {
        self.lock()
            .resources
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .filter_map(|(_, v)| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    pub(crate) fn mock_find_application(&self, display_name: &str) -> Option<Application> {
        self.applications()
            .into_iter()
            .find(|a| a.display_name == display_name)
    }

    pub(crate) fn mock_create_application(
        &self,
        application: &Application,
    ) -> Result<Application, AzureError> {
        let mut created = application.clone();
        let object_id = self.new_guid();
        created.id = Some(object_id.clone());
        created.app_id = Some(self.new_guid());
        self.insert(&application_key(&object_id), &created);
        Ok(created)
    }

    pub(crate) fn mock_add_password(
        &self,
        object_id: &str,
        display_name: &str,
    ) -> Result<PasswordCredential, AzureError> {
        let _: Application = self.load(&application_key(object_id))?;
        let key_id = self.new_guid();
        Ok(PasswordCredential {
            secret_text: Some(format!("secret-{key_id}")),
            key_id: Some(key_id),
            display_name: Some(display_name.to_string()),
            end_date_time: None,
        })
    }

    pub(crate) fn mock_create_service_principal(
        &self,
        app_id: &str,
    ) -> Result<ServicePrincipal, AzureError> {
        if !self
            .applications()
            .iter()
            .any(|a| a.app_id.as_deref() == Some(app_id))
        {
            return Err(AzureError::from_response(
                400,
                "Request_BadRequest",
                &format!("application {app_id} does not exist"),
            ));
        }
        let principal = ServicePrincipal {
            id: Some(self.new_guid()),
            app_id: app_id.to_string(),
            account_enabled: Some(true),
        };
        let object_id = principal.id.clone().unwrap_or_default();
        self.insert(&service_principal_key(&object_id), &principal);
        Ok(principal)
    }

    pub(crate) fn mock_create_role_assignment(
        &self,
        scope: &str,
        name: &str,
        assignment: &RoleAssignment,
    ) -> Result<RoleAssignment, AzureError> {
        let id = ids::role_assignment(scope, name);
        let mut stored = assignment.clone();
        stored.properties.scope = Some(scope.to_string());
        let value: Value = self.store(&id, &stored, None)?;
        Ok(serde_json::from_value(value)?)
    }
}
