use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SerializeError;

/// Encodes items into queue payloads and back.
pub trait Serializer<T> {
    fn dumps(&self, item: &T) -> Result<Vec<u8>, SerializeError>;
    fn loads(&self, data: &[u8]) -> Result<T, SerializeError>;
}

/// Passes byte payloads through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer<Vec<u8>> for RawSerializer {
    fn dumps(&self, item: &Vec<u8>) -> Result<Vec<u8>, SerializeError> {
        Ok(item.clone())
    }

    fn loads(&self, data: &[u8]) -> Result<Vec<u8>, SerializeError> {
        Ok(data.to_vec())
    }
}

/// Encodes any serde type as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<T> Serializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn dumps(&self, item: &T) -> Result<Vec<u8>, SerializeError> {
        Ok(serde_json::to_vec(item)?)
    }

    fn loads(&self, data: &[u8]) -> Result<T, SerializeError> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Job {
        id: u32,
        label: String,
    }

    #[test]
    fn raw_is_identity() {
        let bytes = RawSerializer.dumps(&b"\x00\xffabc".to_vec()).unwrap();
        assert_eq!(bytes, b"\x00\xffabc");
        assert_eq!(RawSerializer.loads(&bytes).unwrap(), b"\x00\xffabc".to_vec());
    }

    #[test]
    fn json_encodes_structs() {
        let job = Job {
            id: 123,
            label: "test message".to_string(),
        };
        let bytes = JsonSerializer.dumps(&job).unwrap();
        assert_eq!(bytes, br#"{"id":123,"label":"test message"}"#);
        let back: Job = JsonSerializer.loads(&bytes).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn json_rejects_garbage() {
        let result: Result<Job, _> = JsonSerializer.loads(b"not json");
        assert!(matches!(result, Err(SerializeError::Json(_))));
    }
}
