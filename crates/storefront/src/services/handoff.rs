//! WhatsApp handoff link.

/// Builds `wa.me` deep links to the shop's WhatsApp number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppHandoff {
    number: String,
}

impl WhatsAppHandoff {
    /// `number` must already be digits only.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
        }
    }

    /// Link that opens a chat with `message` pre-filled.
    #[must_use]
    pub fn link(&self, message: &str) -> String {
        format!(
            "https://wa.me/{}?text={}",
            self.number,
            urlencoding::encode(message)
        )
    }
}
