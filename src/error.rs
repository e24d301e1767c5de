pub type Result<T, E = GribError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum GribError {
    #[error("NotGrib")]
    NotGrib(),

    #[error("EditionMismatch({0})")]
    EditionMismatch(u8),

    #[error("TruncatedMessage")]
    TruncatedMessage(),

    #[error("BufferOverflow")]
    BufferOverflow(),

    #[error("EndSectionMismatch")]
    EndSectionMismatch(),

    #[error("UnknownSection({0})")]
    UnknownSection(u8),

    #[error("UnknownTemplate({section}.{template})")]
    UnknownTemplate { section: u8, template: u16 },

    #[error("SectionLengthMismatch(section {section} declares {declared}, consumed {consumed})")]
    SectionLengthMismatch {
        section: u8,
        declared: usize,
        consumed: usize,
    },

    #[error("InvalidGridSpec({0})")]
    InvalidGridSpec(String),

    #[error("CodecUnavailable({0})")]
    CodecUnavailable(&'static str),

    #[error("StdError({0})")]
    StdError(#[from] std::io::Error),

    #[error("ParseError({0})")]
    ParseError(String),

    #[error("DecodeError({0})")]
    DecodeError(String),

    #[error("EncodeError({0})")]
    EncodeError(String),
}
