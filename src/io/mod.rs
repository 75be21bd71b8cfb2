/// CSV export of published sensor states.
pub mod export;
