pub mod counts;
pub mod engagement;
pub mod interpretation;
pub mod moderation;
pub mod subject;
pub mod verse;
