//! Contract dependency header parsing.
//!
//! A contract declares the SDK components it was written against in the
//! leading comment block of the file:
//!
//! ```text
//! # {
//! #   "Seq": [
//! #     { "Depends": "py-lib-genlayer-embeddings:09h0i2..." },
//! #     { "Depends": "py-genlayer:1j12s63..." }
//! #   ]
//! # }
//! ```
//!
//! The block is matched textually rather than parsed as JSON, so pretty
//! printing and line wrapping are irrelevant.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::runner_ref::is_cache_segment;

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static DEPENDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""Depends":\s*"([^:"]+):([^"]+)""#).expect("valid Depends pattern")
});

/// Runner type of the core SDK component.
pub const CORE_RUNNER: &str = "py-genlayer";

/// Dependencies declared in a contract's leading comment block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractHeader {
    block: String,
    dependencies: BTreeMap<String, String>,
}

impl ContractHeader {
    /// Parses the header of `source`. A later declaration of the same name
    /// replaces an earlier one.
    ///
    /// Declarations whose hash could not name a cache directory, such as
    /// `py-genlayer:../../outside`, are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use genvm_artefacts::ContractHeader;
    ///
    /// let source = concat!(
    ///     "# { \"Seq\": [\n",
    ///     "#   { \"Depends\": \"py-genlayer:abc123\" }\n",
    ///     "# ] }\n",
    ///     "class C: pass\n",
    /// );
    /// let header = ContractHeader::parse(source);
    /// assert_eq!(header.get("py-genlayer"), Some("abc123"));
    /// assert!(header.is_structured());
    /// ```
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let block = header_block(source);
        let dependencies = DEPENDS
            .captures_iter(&block)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().trim();
                let hash = caps.get(2)?.as_str().trim();
                is_cache_segment(hash).then(|| (name.to_owned(), hash.to_owned()))
            })
            .collect();
        Self {
            block,
            dependencies,
        }
    }

    /// The content hash declared for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }

    /// Whether a header comment block is present at all.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.block.is_empty()
    }

    /// Whether the block has the `Seq`/`Depends` shape of a runner header.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.block.contains("\"Seq\"") && self.block.contains("\"Depends\"")
    }

    /// Whether the block mentions the core SDK component.
    #[must_use]
    pub fn mentions_core_runner(&self) -> bool {
        self.block.contains(&format!("{CORE_RUNNER}:"))
    }

    /// Declared `(name, hash)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .map(|(name, hash)| (name.as_str(), hash.as_str()))
    }

    /// Number of declared dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether no dependencies are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Returns the leading run of `#` lines with the comment marker removed,
/// joined by newlines. Stops at the first line not starting with `#`.
#[must_use]
pub fn header_block(source: &str) -> String {
    source
        .lines()
        .map_while(|line| {
            if let Some(rest) = line.strip_prefix("# ") {
                Some(rest.trim())
            } else {
                line.strip_prefix('#')
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_pretty_printed_block() {
        let source = concat!(
            "# {\n",
            "#   \"Seq\": [\n",
            "#     { \"Depends\": \"py-lib-genlayer-embeddings:09h0i2\" },\n",
            "#     { \"Depends\":\n",
            "#       \"py-genlayer:1j12s63\" }\n",
            "#   ]\n",
            "# }\n",
            "from genlayer import *\n",
        );

        let header = ContractHeader::parse(source);

        assert_eq!(header.len(), 2);
        assert_eq!(header.get("py-genlayer"), Some("1j12s63"));
        assert_eq!(header.get("py-lib-genlayer-embeddings"), Some("09h0i2"));
    }

    #[rstest]
    fn stops_at_first_non_comment_line() {
        let source = concat!(
            "# { \"Seq\": [] }\n",
            "\n",
            "# { \"Depends\": \"py-genlayer:late\" }\n",
        );

        let header = ContractHeader::parse(source);

        assert!(header.is_empty());
        assert!(!header.is_structured());
    }

    #[rstest]
    #[case::no_header("from genlayer import *\n", false, false)]
    #[case::plain_comment("# just a note\nx = 1\n", true, false)]
    #[case::runner_header("# { \"Seq\": [{ \"Depends\": \"py-genlayer:a\" }] }\n", true, true)]
    fn classifies_header_shape(
        #[case] source: &str,
        #[case] present: bool,
        #[case] structured: bool,
    ) {
        let header = ContractHeader::parse(source);

        assert_eq!(header.is_present(), present);
        assert_eq!(header.is_structured(), structured);
    }

    #[rstest]
    fn detects_missing_core_runner() {
        let header =
            ContractHeader::parse("# { \"Seq\": [{ \"Depends\": \"py-lib-protobuf:abc\" }] }\n");

        assert!(header.is_structured());
        assert!(!header.mentions_core_runner());
    }

    #[rstest]
    #[case::traversal("../../../../outside")]
    #[case::nested("ab/cd")]
    #[case::backslash("..\\\\outside")]
    #[case::blank(" ")]
    fn drops_hashes_that_leave_the_cache(#[case] hash: &str) {
        let source = format!(
            "# {{ \"Seq\": [{{ \"Depends\": \"py-genlayer:{hash}\" }}, \
             {{ \"Depends\": \"py-lib-protobuf:abc123\" }}] }}\n"
        );

        let header = ContractHeader::parse(&source);

        assert_eq!(header.get(CORE_RUNNER), None);
        assert_eq!(header.get("py-lib-protobuf"), Some("abc123"));
        assert!(header.mentions_core_runner());
    }

    #[rstest]
    fn strips_comment_markers() {
        let block = header_block("#   a  \n#b\n# c\nd\n");

        assert_eq!(block, "a\nb\nc");
    }
}
