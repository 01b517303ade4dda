use std::fmt;

use headers::ContentType;
use serde::Serialize;

use super::ApiClientError;

/// Payload of a call: a content type and the raw bytes to send.
///
/// # Example
///
/// ```rust
/// use mnubo_client::CallBody;
/// # use serde::Serialize;
/// # #[derive(Serialize)]
/// # struct Event { event_type: String }
///
/// # fn example() -> Result<(), mnubo_client::ApiClientError> {
/// let body = CallBody::json(&[Event { event_type: "tick".to_string() }])?;
/// assert_eq!(body.content_type().to_string(), "application/json");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq)]
pub struct CallBody {
    pub(crate) content_type: ContentType,
    pub(crate) data: Vec<u8>,
}

impl CallBody {
    /// Serializes `value` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::SerializationError`] if `value` cannot be serialized.
    pub fn json<T>(value: &T) -> Result<Self, ApiClientError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_vec(value)?;
        Ok(Self {
            content_type: ContentType::json(),
            data,
        })
    }

    /// Serializes `value` as `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::FormEncodingError`] if `value` is not a flat sequence of pairs.
    pub fn form<T>(value: &T) -> Result<Self, ApiClientError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_urlencoded::to_string(value)?.into_bytes();
        Ok(Self {
            content_type: ContentType::form_url_encoded(),
            data,
        })
    }

    /// Creates a body from raw bytes with an explicit content type.
    pub fn raw(content_type: mime::Mime, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: ContentType::from(content_type),
            data: data.into(),
        }
    }

    /// An empty JSON body, used for calls without payload.
    pub fn empty() -> Self {
        Self {
            content_type: ContentType::json(),
            data: Vec::new(),
        }
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Default for CallBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CallBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallBody")
            .field("content_type", &self.content_type.to_string())
            .field("len", &self.data.len())
            .finish()
    }
}
