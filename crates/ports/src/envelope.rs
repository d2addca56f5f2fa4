//! 待发送消息

use bytes::Bytes;

/// 一条待发送的消息：topic + 可选 key + 序列化后的 value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub topic: String,
    pub key: Option<Bytes>,
    pub value: Bytes,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            value: value.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// 占用的缓冲区字节数（key + value）
    pub fn size(&self) -> usize {
        self.key.as_ref().map_or(0, Bytes::len) + self.value.len()
    }
}

/// Broker 确认信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryAck {
    pub partition: i32,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_size() {
        let envelope = Envelope::new("usertopic", vec![0u8; 10]);
        assert_eq!(envelope.size(), 10);
        assert!(envelope.key.is_none());

        let keyed = envelope.with_key("alice");
        assert_eq!(keyed.size(), 15);
    }
}
