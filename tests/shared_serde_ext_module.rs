use connectwiz::schema::Template;
use connectwiz::shared::serde_ext::parse_via_string;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectRef(String);

impl ProjectRef {
    fn parse(raw: &str) -> Result<Self, String> {
        if raw.len() != 20 || !raw.chars().all(|ch| ch.is_ascii_lowercase()) {
            return Err("must be 20 lowercase letters".to_string());
        }
        Ok(Self(raw.to_string()))
    }
}

impl<'de> Deserialize<'de> for ProjectRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "project ref", Self::parse)
    }
}

#[test]
fn shared_serde_ext_module_parses_typed_value_from_string() {
    let parsed: ProjectRef =
        serde_yaml::from_str("abcdefghijklmnopqrst").expect("parse project ref");
    assert_eq!(parsed, ProjectRef("abcdefghijklmnopqrst".to_string()));
}

#[test]
fn shared_serde_ext_module_reports_formatted_parse_error() {
    let err = serde_yaml::from_str::<ProjectRef>("\"abc\"").expect_err("short ref should fail");
    assert!(err.to_string().contains("invalid project ref `abc`"));
    assert!(err.to_string().contains("must be 20 lowercase letters"));
}

#[test]
fn shared_serde_ext_module_backs_template_parsing() {
    let template: Template =
        serde_yaml::from_str("\"npx shadcn add {{framework}}\"").expect("parse template");
    assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["framework"]);

    let err = serde_yaml::from_str::<Template>("\"{{ }}\"").expect_err("empty placeholder");
    assert!(err.to_string().contains("empty placeholder in template"), "{err}");
}
