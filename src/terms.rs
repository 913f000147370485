use crate::curriculum::ParseError;

/// The three terminal examinations of an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn id(self) -> &'static str {
        match self {
            Term::First => "term1",
            Term::Second => "term2",
            Term::Third => "term3",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Term::First => "First Terminal Examination",
            Term::Second => "Second Terminal Examination",
            Term::Third => "Third Terminal Examination",
        }
    }

    pub fn parse(id: &str) -> Result<Term, ParseError> {
        let t = id.trim();
        Term::ALL
            .iter()
            .copied()
            .find(|term| term.id().eq_ignore_ascii_case(t))
            .ok_or_else(|| ParseError::Term(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fixed_ids_parse() {
        assert_eq!(Term::parse("term2"), Ok(Term::Second));
        assert_eq!(Term::parse("TERM3"), Ok(Term::Third));
        assert!(Term::parse("midterm").is_err());
    }
}
