use serde::Serialize;

/// What every domain call hands back to the UI.
///
/// On error `result` is the empty value of `T` and `message` carries the
/// text to display. Errors are never thrown past a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainResponse<T> {
    pub result: T,
    pub is_error: bool,
    pub message: Option<String>,
}

impl<T> DomainResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result,
            is_error: false,
            message: None,
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        if self.is_error {
            Err(self.message.unwrap_or_default())
        } else {
            Ok(self.result)
        }
    }
}

impl<T: Default> DomainResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: T::default(),
            is_error: true,
            message: Some(message.into()),
        }
    }
}
