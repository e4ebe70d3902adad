//! Message-bus payloads.

/// A discrete payload carried over a message-bus connection.
///
/// Messages are arbitrary data: numbers, text, nested lists, or raw bytes.
/// Signal connections never see these — they exist only on the message bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A numeric value.
    Number(f64),
    /// A text value.
    Text(String),
    /// A nested list of messages.
    List(Vec<Message>),
    /// Raw bytes (e.g. MIDI data).
    Bytes(Vec<u8>),
}

impl Message {
    /// Returns the numeric value if this message is a [`Message::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Message::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text if this message is a [`Message::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Coerces the message to a number where a loose reading allows it:
    /// numbers pass through, text is parsed. Lists and bytes never coerce.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Message::Number(value) => Some(*value),
            Message::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Message::Number(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}
