//! Hub topic (spec.md §7's supplemented `$GetTopic`/`$SetTopic`, present
//! in the message classification table but not detailed further — see
//! SPEC_FULL.md §7).

#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub text: String,
    pub set_by: Option<String>,
}
