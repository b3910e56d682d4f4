//! Template CRUD and resolve-then-render entry point.

use std::sync::Arc;

use relay_common::{Content, NotificationRequest, Template, TemplateCreateRequest, TemplateListQuery};
use relay_store::DeliveryStore;

use crate::error::TemplateError;
use crate::renderer;

/// Wraps a [`DeliveryStore`] with the template lookup, validation, and
/// rendering logic the worker and the HTTP API both need.
pub struct TemplateService {
    store: Arc<dyn DeliveryStore>,
}

impl TemplateService {
    #[must_use]
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: TemplateCreateRequest) -> Result<Template, TemplateError> {
        Ok(self.store.create_template(req).await?)
    }

    pub async fn get_by_id(&self, template_id: &str) -> Result<Option<Template>, TemplateError> {
        Ok(self.store.get_template_by_id(template_id).await?)
    }

    pub async fn list(&self, query: TemplateListQuery) -> Result<(Vec<Template>, u64), TemplateError> {
        Ok(self.store.list_templates(query).await?)
    }

    pub async fn set_active(&self, template_id: &str, active: bool) -> Result<bool, TemplateError> {
        Ok(self.store.set_template_active(template_id, active).await?)
    }

    /// Resolve `request.template_id` (identity lookup first, then
    /// active-name fallback) and render, or pass inline `content` through
    /// untouched if no template is referenced.
    pub async fn resolve_and_render(&self, request: &NotificationRequest) -> Result<Content, TemplateError> {
        let Some(template_id) = request.template_id.as_deref() else {
            return Ok(request.content.clone().unwrap_or_default());
        };

        let template = match self.store.get_template_by_id(template_id).await? {
            Some(template) => template,
            None => self
                .store
                .get_active_template_by_name(template_id)
                .await?
                .ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?,
        };

        let missing: Vec<&str> = template
            .variables
            .iter()
            .filter(|name| !request.variables.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingVariables(missing.join(", ")));
        }

        renderer::render(
            template.content.subject.as_deref(),
            &template.content.body,
            &request.variables,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use relay_common::{Channel, Priority};
    use relay_store::InMemoryStore;
    use serde_json::{json, Value};

    use super::*;

    fn notification(template_id: Option<&str>, variables: HashMap<String, Value>) -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Email,
            recipient: "a@example.com".into(),
            template_id: template_id.map(str::to_string),
            content: None,
            variables,
            priority: Priority::Normal,
            metadata: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_resolve_by_id_renders() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        let template = service
            .create(TemplateCreateRequest {
                name: "welcome".into(),
                channel: Channel::Email,
                subject: Some("Hi {{ name }}".into()),
                body: "Welcome, {{ name }}!".into(),
                variables: vec!["name".into()],
                active: true,
            })
            .await
            .unwrap();

        let mut variables = HashMap::new();
        variables.insert("name".to_string(), json!("Ada"));
        let request = notification(Some(&template.template_id), variables);

        let content = service.resolve_and_render(&request).await.unwrap();
        assert_eq!(content.subject.as_deref(), Some("Hi Ada"));
        assert_eq!(content.body, "Welcome, Ada!");
    }

    #[tokio::test]
    async fn test_resolve_by_name_fallback() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        service
            .create(TemplateCreateRequest {
                name: "reminder".into(),
                channel: Channel::Sms,
                subject: None,
                body: "Don't forget, {{ name }}".into(),
                variables: vec!["name".into()],
                active: true,
            })
            .await
            .unwrap();

        let mut variables = HashMap::new();
        variables.insert("name".to_string(), json!("Grace"));
        let request = notification(Some("reminder"), variables);

        let content = service.resolve_and_render(&request).await.unwrap();
        assert_eq!(content.body, "Don't forget, Grace");
    }

    #[tokio::test]
    async fn test_unresolvable_template_is_not_found() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        let request = notification(Some("does-not-exist"), HashMap::new());
        let err = service.resolve_and_render(&request).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_variables_reported() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        let template = service
            .create(TemplateCreateRequest {
                name: "invoice".into(),
                channel: Channel::Email,
                subject: None,
                body: "Total: {{ amount | currency }}".into(),
                variables: vec!["amount".into()],
                active: true,
            })
            .await
            .unwrap();

        let request = notification(Some(&template.template_id), HashMap::new());
        let err = service.resolve_and_render(&request).await.unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariables(_)));
    }

    #[tokio::test]
    async fn test_no_template_id_passes_inline_content() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        let mut request = notification(None, HashMap::new());
        request.content = Some(Content {
            subject: Some("raw subject".into()),
            body: "raw {{ not_rendered }}".into(),
        });
        let content = service.resolve_and_render(&request).await.unwrap();
        assert_eq!(content.subject.as_deref(), Some("raw subject"));
        assert_eq!(content.body, "raw {{ not_rendered }}");
    }

    #[tokio::test]
    async fn test_inactive_template_is_not_resolved_by_name() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let service = TemplateService::new(store);
        let template = service
            .create(TemplateCreateRequest {
                name: "draft".into(),
                channel: Channel::Email,
                subject: None,
                body: "hi".into(),
                variables: vec![],
                active: true,
            })
            .await
            .unwrap();
        service.set_active(&template.template_id, false).await.unwrap();

        let request = notification(Some("draft"), HashMap::new());
        let err = service.resolve_and_render(&request).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
