use serde::{Deserialize, Serialize};

/// Webhook 外层结构: `{"type": "...", "data": {...}}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommerceEventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdRef {
    pub id: String,
}

/// membership.* 事件的 data 部分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MembershipData {
    /// membership id
    pub id: String,
    #[serde(default)]
    pub plan: Option<IdRef>,
    #[serde(default)]
    pub product: Option<IdRef>,
    /// 对应 tenant
    #[serde(default)]
    pub company: Option<IdRef>,
    #[serde(default)]
    pub user: Option<IdRef>,
}

impl MembershipData {
    pub fn plan_id(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.id.as_str())
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.id.as_str())
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.company
            .as_ref()
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommerceEvent {
    MembershipActivated(MembershipData),
    MembershipDeactivated(MembershipData),
    /// payment.* / invoice.*: 只记录日志
    Billing { event_type: String },
    Unhandled { event_type: String },
}

impl CommerceEvent {
    pub fn event_type(&self) -> &str {
        match self {
            CommerceEvent::MembershipActivated(_) => "membership.activated",
            CommerceEvent::MembershipDeactivated(_) => "membership.deactivated",
            CommerceEvent::Billing { event_type } | CommerceEvent::Unhandled { event_type } => {
                event_type
            }
        }
    }
}

impl TryFrom<CommerceEventEnvelope> for CommerceEvent {
    type Error = serde_json::Error;

    fn try_from(envelope: CommerceEventEnvelope) -> Result<Self, Self::Error> {
        let event = match envelope.event_type.as_str() {
            "membership.activated" => {
                CommerceEvent::MembershipActivated(serde_json::from_value(envelope.data)?)
            }
            "membership.deactivated" => {
                CommerceEvent::MembershipDeactivated(serde_json::from_value(envelope.data)?)
            }
            t if t.starts_with("payment.") || t.starts_with("invoice.") => CommerceEvent::Billing {
                event_type: envelope.event_type,
            },
            _ => CommerceEvent::Unhandled {
                event_type: envelope.event_type,
            },
        };
        Ok(event)
    }
}

impl CommerceEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: CommerceEventEnvelope = serde_json::from_slice(body)?;
        CommerceEvent::try_from(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_membership_activated() {
        let body = br#"{
            "type": "membership.activated",
            "data": {
                "id": "mem_1",
                "plan": {"id": "plan_pro"},
                "company": {"id": "biz_42"},
                "user": {"id": "user_7"}
            }
        }"#;
        let event = CommerceEvent::parse(body).unwrap();
        match event {
            CommerceEvent::MembershipActivated(data) => {
                assert_eq!(data.id, "mem_1");
                assert_eq!(data.plan_id(), Some("plan_pro"));
                assert_eq!(data.product_id(), None);
                assert_eq!(data.tenant_id(), Some("biz_42"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_billing_and_unknown_events() {
        let event = CommerceEvent::parse(br#"{"type": "payment.succeeded", "data": {}}"#).unwrap();
        assert!(matches!(event, CommerceEvent::Billing { .. }));
        assert_eq!(event.event_type(), "payment.succeeded");

        let event = CommerceEvent::parse(br#"{"type": "app.installed"}"#).unwrap();
        assert!(matches!(event, CommerceEvent::Unhandled { .. }));
    }

    #[test]
    fn test_membership_event_without_id_is_rejected() {
        assert!(CommerceEvent::parse(br#"{"type": "membership.deactivated", "data": {}}"#).is_err());
        assert!(CommerceEvent::parse(b"not json").is_err());
    }
}
