//! `%[TOKEN]` substitution language used by the "extended welcome" and
//! MyINFO-prefix templates (spec.md §9 open question).
//!
//! Decision (recorded in DESIGN.md): the token set is frozen to exactly
//! the ones spec.md names; unknown `%[...]` tokens pass through literally
//! rather than erroring, so an operator typo degrades gracefully instead
//! of corrupting the greeting.

use std::collections::HashMap;

pub struct TemplateContext {
    pub class: String,
    pub class_name: String,
    pub country_code: String,
    pub country_name: String,
    pub city: String,
    pub mode: String,
    pub pattern: String,
    pub nick: String,
}

impl TemplateContext {
    fn tokens(&self) -> HashMap<&'static str, &str> {
        HashMap::from([
            ("%[CLASS]", self.class.as_str()),
            ("%[CC]", self.country_code.as_str()),
            ("%[CN]", self.country_name.as_str()),
            ("%[CITY]", self.city.as_str()),
            ("%[MODE]", self.mode.as_str()),
            ("%[CLASSNAME]", self.class_name.as_str()),
            ("%[pattern]", self.pattern.as_str()),
            ("%[nick]", self.nick.as_str()),
        ])
    }
}

/// Replace every known `%[TOKEN]` in `template` with its value; tokens the
/// map doesn't recognize are left untouched.
pub fn substitute(template: &str, ctx: &TemplateContext) -> String {
    let tokens = ctx.tokens();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("%[") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match after.find(']') {
            Some(end) => {
                let token = &after[..=end];
                match tokens.get(token) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(token),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(after);
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            class: "2".into(),
            class_name: "reguser".into(),
            country_code: "US".into(),
            country_name: "United States".into(),
            city: "".into(),
            mode: "A".into(),
            pattern: "".into(),
            nick: "alice".into(),
        }
    }

    #[test]
    fn substitutes_known_tokens() {
        let out = substitute("welcome %[nick] (%[CC], class %[CLASSNAME])", &ctx());
        assert_eq!(out, "welcome alice (US, class reguser)");
    }

    #[test]
    fn leaves_unknown_tokens_literal() {
        let out = substitute("hello %[UNKNOWN]!", &ctx());
        assert_eq!(out, "hello %[UNKNOWN]!");
    }

    #[test]
    fn unterminated_token_passes_through() {
        let out = substitute("oops %[nick", &ctx());
        assert_eq!(out, "oops %[nick");
    }
}
