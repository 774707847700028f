use bytes::{Buf, Bytes};

/// An outgoing HTTP message split into its header and payload parts.
///
/// The generic parameter `T` carries the header, while `Data` is the type of the payload
/// chunks (defaults to `Bytes`).
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Represents an item in the HTTP message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// Represents the size information of an HTTP payload.
///
/// Bodies are always delimited by `Content-Length`, so there is no chunked variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    pub fn of(len: u64) -> Self {
        if len == 0 { PayloadSize::Empty } else { PayloadSize::Length(len) }
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            PayloadSize::Length(n) => *n,
            PayloadSize::Empty => 0,
        }
    }
}

impl<T, D: Buf> Message<T, D> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

/// Converts bytes into a payload message.
impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_size_of() {
        assert_eq!(PayloadSize::of(0), PayloadSize::Empty);
        assert_eq!(PayloadSize::of(12), PayloadSize::Length(12));
        assert_eq!(PayloadSize::of(12).len(), 12);
        assert!(PayloadSize::Empty.is_empty());
    }

    #[test]
    fn bytes_into_message() {
        let message: Message<()> = Bytes::from_static(b"abc").into();
        assert!(message.is_payload());
        assert!(!message.is_header());
    }
}
