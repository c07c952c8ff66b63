use thiserror::Error;

/// Why a fetched page yielded no price record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The body is the protection vendor's challenge page, not the
    /// product page. The fetcher keys its retry decision off the same
    /// markers that produce this variant.
    #[error("blocked by bot protection")]
    BotBlocked,

    #[error("could not parse price from page")]
    Unparseable,
}
