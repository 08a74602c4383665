pub mod admission;
pub mod chat;
pub mod ctm;
pub mod login;
pub mod opcmd;
pub mod search;
