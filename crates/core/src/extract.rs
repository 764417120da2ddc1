use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::AnalysisError;
use crate::types::TestStyle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTest {
    pub suite: String,
    pub name: String,
}

/// Structural signature of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub functions: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub tests: Vec<ExtractedTest>,
    pub has_stub_markers: bool,
}

/// Derives a [`Signature`] from comment-stripped source text.
///
/// The scanner and every later stage only see this trait, so a real parser can
/// replace the pattern-based [`LexicalExtractor`] per language.
pub trait SignatureExtractor {
    fn extract(&self, stripped: &str) -> Signature;
}

const CONTROL_FLOW: &[&str] = &[
    "if",
    "for",
    "while",
    "switch",
    "catch",
    "return",
    "else",
    "do",
    "foreach",
    "using",
    "lock",
    "fixed",
    "new",
    "delete",
    "throw",
    "case",
    "sizeof",
    "typeof",
    "nameof",
    "decltype",
    "alignof",
    "static_assert",
    "defined",
];

fn regex_function_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?m)^[ \t]*(?:[\w:<>,*&~\[\]]+[ \t]+)*?[*&]*",
            r"(~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*)[ \t]*",
            r"\([^()]*(?:\([^()]*\)[^()]*)*\)\s*",
            r"(?:const\s*)?(?:noexcept\s*)?(?:override\s*)?(?:final\s*)?",
            r"(?:->[^{;]*)?(?::[^;{]*)?\{",
        ))
        .unwrap()
    })
}

fn regex_type_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?m)^[ \t]*(?:template[ \t]*<[^>]*>\s*)?",
            r"(?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|unsafe|export)[ \t]+)*",
            r"(?:class|struct|interface|record)[ \t]+([A-Za-z_]\w*)",
            r"(?:[ \t]+final)?[^;{()]*\{",
        ))
        .unwrap()
    })
}

fn regex_stub_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bthrow\b[^;]*not[\s_-]*implemented|NotImplemented(?:Exception|Error)")
            .unwrap()
    })
}

fn regex_todo_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:TODO|FIXME|XXX)\b").unwrap())
}

/// `TODO`/`FIXME`/`XXX`; checked on raw text because these live in comments.
pub(crate) fn has_todo_markers(raw: &str) -> bool {
    regex_todo_marker().is_match(raw)
}

#[derive(Debug, Clone)]
enum TestPattern {
    /// Capture 1 is the method name; the suite is the enclosing type.
    Attribute(Regex),
    /// Captures 1 and 2 are suite and name.
    Macro(Regex),
}

/// Pattern-based extractor for C-family sources.
#[derive(Debug, Clone)]
pub struct LexicalExtractor {
    tests: TestPattern,
    excluded_names: HashSet<String>,
}

impl LexicalExtractor {
    pub fn new(style: &TestStyle) -> Result<Self, AnalysisError> {
        let names = style.marker_names();
        if names.is_empty() {
            return Err(AnalysisError::invalid_option(
                "test_style",
                "at least one test marker or macro name is required",
            ));
        }
        if let Some(bad) = names.iter().find(|n| !is_marker_name(n)) {
            return Err(AnalysisError::invalid_option(
                "test_style",
                format!("{bad:?} is not an identifier"),
            ));
        }

        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");

        let tests = match style {
            TestStyle::AttributeMarked { .. } => TestPattern::Attribute(compile(&format!(
                concat!(
                    r"\[\s*(?:{alternation})\b[^\]]*\](?:\s*\[[^\]]*\])*\s*",
                    r"(?:(?:public|private|protected|internal|static|async|override|virtual|new|unsafe)\s+)*",
                    r"[\w<>\[\],.?]+\s+([A-Za-z_]\w*)\s*\(",
                ),
                alternation = alternation
            ))?),
            TestStyle::MacroCall { .. } => TestPattern::Macro(compile(&format!(
                r"\b(?:{alternation})\s*\(\s*([A-Za-z_]\w*)\s*,\s*([A-Za-z_]\w*)\s*[,)]"
            ))?),
        };

        let mut excluded_names: HashSet<String> =
            CONTROL_FLOW.iter().map(|s| s.to_string()).collect();
        excluded_names.extend(names.iter().cloned());

        Ok(Self {
            tests,
            excluded_names,
        })
    }

    fn functions(&self, stripped: &str) -> BTreeSet<String> {
        regex_function_decl()
            .captures_iter(stripped)
            .filter_map(|caps| caps.get(1))
            .map(|m| last_segment(m.as_str()))
            .filter(|name| !name.starts_with('~') && !self.excluded_names.contains(*name))
            .map(str::to_string)
            .collect()
    }

    fn tests(&self, stripped: &str) -> Vec<ExtractedTest> {
        match &self.tests {
            TestPattern::Macro(re) => re
                .captures_iter(stripped)
                .filter_map(|caps| {
                    Some(ExtractedTest {
                        suite: caps.get(1)?.as_str().to_string(),
                        name: caps.get(2)?.as_str().to_string(),
                    })
                })
                .collect(),
            TestPattern::Attribute(re) => {
                let type_offsets: Vec<(usize, &str)> = regex_type_decl()
                    .captures_iter(stripped)
                    .filter_map(|caps| {
                        let name = caps.get(1)?;
                        Some((name.start(), name.as_str()))
                    })
                    .collect();

                re.captures_iter(stripped)
                    .filter_map(|caps| {
                        let name = caps.get(1)?;
                        let suite = type_offsets
                            .iter()
                            .take_while(|(offset, _)| *offset < name.start())
                            .last()
                            .map(|(_, suite)| suite.to_string())
                            .unwrap_or_default();
                        Some(ExtractedTest {
                            suite,
                            name: name.as_str().to_string(),
                        })
                    })
                    .collect()
            }
        }
    }
}

impl SignatureExtractor for LexicalExtractor {
    fn extract(&self, stripped: &str) -> Signature {
        let types = regex_type_decl()
            .captures_iter(stripped)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect();

        Signature {
            functions: self.functions(stripped),
            types,
            tests: self.tests(stripped),
            has_stub_markers: regex_stub_marker().is_match(stripped),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, AnalysisError> {
    Regex::new(pattern).map_err(|source| AnalysisError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn is_marker_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn last_segment(qualified: &str) -> &str {
    qualified.rsplit("::").next().unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::strip_comments;

    fn cpp() -> LexicalExtractor {
        LexicalExtractor::new(&TestStyle::macro_default()).unwrap()
    }

    fn csharp() -> LexicalExtractor {
        LexicalExtractor::new(&TestStyle::attribute_default()).unwrap()
    }

    #[test]
    fn finds_functions_and_skips_control_flow() {
        let src = r#"
static int Add(int a, int b) {
    if (a > b) {
        return a;
    }
    for (int i = 0; i < b; ++i) {
    }
    return a + b;
}

std::string Block::ToString() const override
{
    return "";
}

Widget::Widget(int x) : x_(x), y_(compute(x)) {
}

Widget::~Widget() {
}

void Declared(int x);
"#;
        let sig = cpp().extract(&strip_comments(src));
        let names: Vec<&str> = sig.functions.iter().map(String::as_str).collect();
        assert_eq!(names, ["Add", "ToString", "Widget"]);
    }

    #[test]
    fn finds_type_declarations_with_base_lists() {
        let src = r#"
class Foo : public Bar, private Baz
{
};
struct Point { int x; };
class Forward;
template <typename T>
class Holder final {
};
enum class Color { Red };
"#;
        let sig = cpp().extract(src);
        let names: Vec<&str> = sig.types.iter().map(String::as_str).collect();
        assert_eq!(names, ["Foo", "Holder", "Point"]);
    }

    #[test]
    fn macro_tests_resolve_suite_and_name() {
        let src = r#"
TEST(IOTest, SerializeEmptyArray) {
}
TEST_F( BlockFixture , Verify ) {
}
TEST_P(Param, Case, extra) {}
MY_TEST(Nope, Nope) {}
"#;
        let sig = cpp().extract(src);
        let pairs: Vec<(&str, &str)> = sig
            .tests
            .iter()
            .map(|t| (t.suite.as_str(), t.name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("IOTest", "SerializeEmptyArray"),
                ("BlockFixture", "Verify"),
                ("Param", "Case"),
            ]
        );
        assert!(!sig.functions.contains("TEST"));
        assert!(!sig.functions.contains("TEST_F"));
    }

    #[test]
    fn attribute_tests_use_enclosing_class_as_suite() {
        let src = r#"
[TestClass]
public class UT_Crypto
{
    [TestInitialize]
    public void Setup() { }

    [TestMethod]
    public void TestVerifySignature()
    {
    }

    [TestMethod, Timeout(1000)]
    [Description("x")]
    public async Task TestHashAsync() { }
}

public class UT_Base58
{
    [Fact]
    public void Decode() { }
}
"#;
        let sig = csharp().extract(&strip_comments(src));
        let pairs: Vec<(&str, &str)> = sig
            .tests
            .iter()
            .map(|t| (t.suite.as_str(), t.name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("UT_Crypto", "TestVerifySignature"),
                ("UT_Crypto", "TestHashAsync"),
                ("UT_Base58", "Decode"),
            ]
        );
    }

    #[test]
    fn data_row_tests_are_recognised() {
        let src = r#"
[TestClass]
public class UT_BigDecimal
{
    [DataTestMethod]
    [DataRow("1.5", 1)]
    [DataRow("0", 0)]
    public void TestParse(string text, int decimals) { }
}
"#;
        let sig = csharp().extract(&strip_comments(src));
        let names: Vec<&str> = sig.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["TestParse"]);
        assert_eq!(sig.tests[0].suite, "UT_BigDecimal");
    }

    #[test]
    fn stub_and_todo_markers() {
        let stub = "void F() { throw std::runtime_error(\"Not implemented yet\"); }";
        assert!(cpp().extract(stub).has_stub_markers);
        let cs = "public void F() { throw new NotImplementedException(); }";
        assert!(csharp().extract(cs).has_stub_markers);
        assert!(!cpp().extract("void F() { return; }").has_stub_markers);

        assert!(has_todo_markers("int x; // TODO: finish"));
        assert!(!has_todo_markers("int todos;"));
    }

    #[test]
    fn rejects_invalid_marker_names() {
        let style = TestStyle::MacroCall {
            macros: vec!["TEST(".to_string()],
        };
        assert!(matches!(
            LexicalExtractor::new(&style),
            Err(AnalysisError::InvalidOption { .. })
        ));
        let empty = TestStyle::AttributeMarked { markers: vec![] };
        assert!(LexicalExtractor::new(&empty).is_err());
    }
}
