use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

/// Where an organization wants alerts delivered beyond the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannels {
    pub slack_webhook_url: Option<String>,
    pub alert_email_recipients: Vec<String>,
}

impl NotificationChannels {
    pub fn slack_webhook(&self) -> Option<&str> {
        self.slack_webhook_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn has_email_recipients(&self) -> bool {
        self.alert_email_recipients.iter().any(|recipient| !recipient.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationChannels;

    #[test]
    fn blank_webhook_counts_as_unconfigured() {
        let channels = NotificationChannels {
            slack_webhook_url: Some("   ".to_string()),
            alert_email_recipients: vec![" ".to_string()],
        };

        assert_eq!(channels.slack_webhook(), None);
        assert!(!channels.has_email_recipients());
    }
}
