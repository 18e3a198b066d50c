pub mod convert;
pub mod correct;
pub mod merge;
pub mod relocate;
pub mod rewrite;
