use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter field: {0}")]
    InvalidField(String),
}
