use super::expr::{ExprEvaluator, rename_var};
use super::var::{Attr, THIS, Var, VarValues};
use crate::error::ConstraintError;
use crate::geom::{OpenRange, Rect};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Independent width and height ranges for one component.
///
/// Accepted syntax:
///
/// ```text
/// "8x1"              width 8, height 1
/// "2+ x *"           width at least 2, any height
/// "w=2..4, height:1" keyed form; missing keys are unconstrained
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeConstraint {
    pub component: String,
    pub width: Option<OpenRange>,
    pub height: Option<OpenRange>,
}

impl SizeConstraint {
    pub fn new(width: Option<OpenRange>, height: Option<OpenRange>) -> Self {
        SizeConstraint { component: THIS.to_string(), width, height }
    }

    pub fn parse(text: &str) -> Result<Self, ConstraintError> {
        let parse_error = |reason: &str| ConstraintError::Parse { input: text.to_string(), reason: reason.to_string() };
        let mut width = None;
        let mut height = None;

        if text.contains('=') || text.contains(':') {
            for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let (key, value) = entry.split_once(['=', ':']).ok_or_else(|| parse_error("expected key=range"))?;
                let range: OpenRange = value.trim().parse()?;
                match key.trim().parse::<Attr>()? {
                    Attr::Width => width = Some(range),
                    Attr::Height => height = Some(range),
                    _ => return Err(parse_error("only width and height can be constrained")),
                }
            }
        } else {
            let (w, h) = text.split_once(['x', 'X']).ok_or_else(|| parse_error("expected WxH"))?;
            let (w, h) = (w.trim(), h.trim());
            width = if w == "*" { None } else { Some(w.parse()?) };
            height = if h == "*" { None } else { Some(h.parse()?) };
        }
        Ok(SizeConstraint::new(width, height))
    }

    fn dimensions(&self) -> impl Iterator<Item = (Attr, &OpenRange)> {
        [(Attr::Width, self.width.as_ref()), (Attr::Height, self.height.as_ref())]
            .into_iter()
            .filter_map(|(attr, range)| range.map(|r| (attr, r)))
    }

    /// Check a rectangle directly.
    pub fn admits(&self, rect: &Rect) -> bool {
        self.dimensions().all(|(attr, range)| range.contains(attr.of(rect)))
    }

    /// The smallest admissible `(width, height)`, at least 1×1.
    pub fn min_size(&self) -> (i64, i64) {
        let min = |r: Option<OpenRange>| r.and_then(|r| r.start()).unwrap_or(1).max(1);
        (min(self.width), min(self.height))
    }
}

impl ExprEvaluator for SizeConstraint {
    fn describe(&self) -> String {
        format!("size constraint {self}")
    }

    fn referenced_variables(&self) -> BTreeSet<Var> {
        self.dimensions().map(|(attr, _)| Var::new(self.component.clone(), attr)).collect()
    }

    fn eval_partial(&self, values: &VarValues) -> Option<bool> {
        super::expr::all3(self.dimensions().map(|(attr, range)| {
            values.get(&Var::new(self.component.clone(), attr)).map(|v| range.contains(*v))
        }))
    }

    fn replace_vars(&mut self, mapping: &HashMap<Var, Var>) {
        // Sizes only ever track a whole component; follow the width variable.
        if let Some(target) = mapping.get(&Var::new(self.component.clone(), Attr::Width)) {
            self.component = target.component.clone();
        }
    }

    fn replace_components(&mut self, mapping: &HashMap<String, String>) {
        let mut renamed = Var::new(self.component.clone(), Attr::Width);
        rename_var(&mut renamed, mapping);
        self.component = renamed.component;
    }

    fn box_clone(&self) -> Box<dyn ExprEvaluator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for SizeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |r: &Option<OpenRange>| r.map_or("*".to_string(), |r| r.to_string());
        write!(f, "{}x{}", show(&self.width), show(&self.height))?;
        if !self.component.is_empty() {
            write!(f, " of '{}'", self.component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_syntaxes() {
        let a = SizeConstraint::parse("8x1").unwrap();
        assert_eq!(a.width, Some(OpenRange::exact(8)));
        assert_eq!(a.height, Some(OpenRange::exact(1)));

        let b = SizeConstraint::parse("2+ x *").unwrap();
        assert_eq!(b.width, Some(OpenRange::at_least(2)));
        assert_eq!(b.height, None);

        let c = SizeConstraint::parse("h=2..4").unwrap();
        assert_eq!(c.width, None);
        assert_eq!(c.height, Some(OpenRange::between(2, 4)));

        assert!(SizeConstraint::parse("left=3").is_err());
        assert!(SizeConstraint::parse("8").is_err());
    }

    #[test]
    fn eval_ignores_unrelated_keys() {
        let size = SizeConstraint::parse("w=2..4").unwrap();
        let mut values = VarValues::new();
        values.insert(Var::this(Attr::Width), 3);
        values.insert(Var::this(Attr::Height), 100);
        values.insert(Var::new("other", Attr::Width), 100);
        assert_eq!(size.eval(&values), Ok(true));

        values.insert(Var::this(Attr::Width), 5);
        assert_eq!(size.eval(&values), Ok(false));
        assert!(size.eval(&VarValues::new()).is_err());
    }

    #[test]
    fn renaming_moves_the_component() {
        let mut size = SizeConstraint::parse("1x1").unwrap();
        size.replace_components(&HashMap::from([(String::new(), "cell".to_string())]));
        assert_eq!(size.component, "cell");
        assert!(size.referenced_variables().contains(&Var::new("cell", Attr::Height)));
        assert!(size.admits(&Rect::cell(4, 4)));
        assert_eq!(SizeConstraint::parse("2+ x 3..5").unwrap().min_size(), (2, 3));
    }
}
