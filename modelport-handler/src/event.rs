//! CloudFormation custom-resource event and response payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle operation requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// The event delivered to the handler on stack create/update/delete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
}

impl CustomResourceEvent {
    /// Stable physical id: keep the one the engine already knows, or
    /// derive one from the logical id on first create.
    pub fn effective_physical_id(&self) -> String {
        self.physical_resource_id
            .clone()
            .unwrap_or_else(|| format!("{}-import", self.logical_resource_id))
    }
}

/// Parameters the template passes to the custom resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default)]
    pub repo_id: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub imported_model_name: String,
    #[serde(default)]
    pub role_arn: String,
    #[serde(default)]
    pub job_name_prefix: Option<String>,
}

/// Completion status reported back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

/// The payload delivered to the presigned response URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl CustomResourceResponse {
    pub fn success(event: &CustomResourceEvent, data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id: event.effective_physical_id(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }

    pub fn failure(event: &CustomResourceEvent, reason: String) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason: Some(reason),
            physical_resource_id: event.effective_physical_id(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_event_json() -> Value {
        json!({
            "RequestType": "Create",
            "ServiceToken": "arn:aws:lambda:us-west-2:123456789012:function:modelport-handler",
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/signed",
            "StackId": "arn:aws:cloudformation:us-west-2:123456789012:stack/model-import-stack/guid",
            "RequestId": "req-1234",
            "LogicalResourceId": "ModelImportTrigger",
            "ResourceType": "Custom::ModelImport",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:us-west-2:123456789012:function:modelport-handler",
                "RepoId": "org/tiny-model",
                "Bucket": "model-bucket-1a2b3c",
                "ImportedModelName": "tiny-model",
                "RoleArn": "arn:aws:iam::123456789012:role/model-import"
            }
        })
    }

    #[test]
    fn test_event_parse() {
        let event: CustomResourceEvent = serde_json::from_value(sample_event_json()).unwrap();
        assert_eq!(event.request_type, RequestType::Create);
        assert_eq!(event.logical_resource_id, "ModelImportTrigger");
        assert_eq!(event.resource_properties.repo_id, "org/tiny-model");
        assert_eq!(event.resource_properties.bucket, "model-bucket-1a2b3c");
        assert_eq!(event.resource_properties.revision, None);
        assert_eq!(
            event.effective_physical_id(),
            "ModelImportTrigger-import"
        );
    }

    #[test]
    fn test_event_parse_keeps_existing_physical_id() {
        let mut json = sample_event_json();
        json["RequestType"] = json!("Delete");
        json["PhysicalResourceId"] = json!("ModelImportTrigger-import");
        let event: CustomResourceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(event.effective_physical_id(), "ModelImportTrigger-import");
    }

    #[test]
    fn test_success_response_serialization() {
        let event: CustomResourceEvent = serde_json::from_value(sample_event_json()).unwrap();
        let response = CustomResourceResponse::success(
            &event,
            json!({ "ModelImportJobArn": "arn:aws:bedrock:::job/abc" }),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Status"], "SUCCESS");
        assert_eq!(value["PhysicalResourceId"], "ModelImportTrigger-import");
        assert_eq!(value["RequestId"], "req-1234");
        assert_eq!(value["Data"]["ModelImportJobArn"], "arn:aws:bedrock:::job/abc");
        assert!(value.get("Reason").is_none());
    }

    #[test]
    fn test_failure_response_serialization() {
        let event: CustomResourceEvent = serde_json::from_value(sample_event_json()).unwrap();
        let response =
            CustomResourceResponse::failure(&event, "Hub error: repository not found".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Status"], "FAILED");
        assert_eq!(value["Reason"], "Hub error: repository not found");
        assert!(value.get("Data").is_none());
    }
}
