/// Separator hierarchies for recursive splitting, most structural first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorSet {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    CSharp,
    Go,
    Ruby,
    Php,
    Rust,
    Kotlin,
    Swift,
    Scala,
    Markdown,
    Html,
    Plain,
}

const TAIL: [&str; 4] = ["\n\n", "\n", " ", ""];

macro_rules! separators {
    ($($sep:expr),* $(,)?) => {
        &[$($sep,)* "\n\n", "\n", " ", ""]
    };
}

impl SeparatorSet {
    pub fn separators(&self) -> &'static [&'static str] {
        match self {
            SeparatorSet::Python => separators!["\nclass ", "\ndef ", "\n\tdef ", "\n    def "],
            SeparatorSet::JavaScript => separators![
                "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ",
            ],
            SeparatorSet::TypeScript => separators![
                "\nenum ", "\ninterface ", "\nnamespace ", "\ntype ", "\nclass ", "\nfunction ",
                "\nconst ", "\nlet ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nswitch ",
                "\ncase ", "\ndefault ",
            ],
            SeparatorSet::Java => separators![
                "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ",
                "\nfor ", "\nwhile ", "\nswitch ", "\ncase ",
            ],
            SeparatorSet::Cpp => separators![
                "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ",
                "\nwhile ", "\nswitch ", "\ncase ",
            ],
            SeparatorSet::CSharp => separators![
                "\ninterface ", "\nenum ", "\nimplements ", "\ndelegate ", "\nevent ", "\nclass ",
                "\nabstract ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nreturn ",
                "\nif ", "\ncontinue ", "\nfor ", "\nforeach ", "\nwhile ", "\nswitch ",
                "\nbreak ", "\ncase ", "\nelse ", "\ntry ", "\nthrow ", "\nfinally ", "\ncatch ",
            ],
            SeparatorSet::Go => separators![
                "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ",
                "\ncase ",
            ],
            SeparatorSet::Ruby => separators![
                "\ndef ", "\nclass ", "\nif ", "\nunless ", "\nwhile ", "\nfor ", "\ndo ",
                "\nbegin ", "\nrescue ",
            ],
            SeparatorSet::Php => separators![
                "\nfunction ", "\nclass ", "\nif ", "\nforeach ", "\nwhile ", "\ndo ",
                "\nswitch ", "\ncase ",
            ],
            SeparatorSet::Rust => separators![
                "\nfn ", "\npub fn ", "\nimpl ", "\nstruct ", "\nenum ", "\nconst ", "\nlet ",
                "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ",
            ],
            SeparatorSet::Kotlin => separators![
                "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\ninternal ",
                "\ncompanion ", "\nfun ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ",
                "\nwhen ", "\ncase ", "\nelse ",
            ],
            SeparatorSet::Swift => separators![
                "\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nif ", "\nfor ", "\nwhile ",
                "\ndo ", "\nswitch ", "\ncase ",
            ],
            SeparatorSet::Scala => separators![
                "\nclass ", "\nobject ", "\ndef ", "\nval ", "\nvar ", "\nif ", "\nfor ",
                "\nwhile ", "\nmatch ", "\ncase ",
            ],
            SeparatorSet::Markdown => separators![
                "\n# ", "\n## ", "\n### ", "\n#### ", "\n##### ", "\n###### ", "```\n",
                "\n***\n", "\n---\n", "\n___\n",
            ],
            SeparatorSet::Html => separators![
                "<body", "<div", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6",
                "<span", "<table", "<tr", "<td", "<th", "<ul", "<ol", "<header", "<footer",
                "<nav", "<head", "<style", "<script", "<meta", "<title",
            ],
            SeparatorSet::Plain => &TAIL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_set_ends_with_plain_tail() {
        for set in [SeparatorSet::Python, SeparatorSet::Html, SeparatorSet::Plain] {
            let seps = set.separators();
            assert_eq!(&seps[seps.len() - 4..], &TAIL);
        }
    }

    #[test]
    fn test_python_prefers_class_then_def() {
        let seps = SeparatorSet::Python.separators();
        assert_eq!(seps[0], "\nclass ");
        assert_eq!(seps[1], "\ndef ");
    }
}
