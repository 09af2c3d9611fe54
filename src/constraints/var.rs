use crate::error::ConstraintError;
use crate::geom::Rect;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Component name used for the constrained pattern itself.
pub const THIS: &str = "";
/// Component name used for the enclosing (parent) pattern.
pub const PARENT: &str = "_";

/// Map the `this` / `parent` aliases to their canonical names.
pub fn canonical_component(name: &str) -> &str {
    match name {
        "this" => THIS,
        "parent" => PARENT,
        other => other,
    }
}

/// A rectangle attribute a constraint can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    Left,
    Top,
    Right,
    Bottom,
    Width,
    Height,
}

impl Attr {
    pub const ALL: [Attr; 6] = [Attr::Left, Attr::Top, Attr::Right, Attr::Bottom, Attr::Width, Attr::Height];

    pub fn of(self, rect: &Rect) -> i64 {
        match self {
            Attr::Left => rect.left(),
            Attr::Top => rect.top(),
            Attr::Right => rect.right(),
            Attr::Bottom => rect.bottom(),
            Attr::Width => rect.width(),
            Attr::Height => rect.height(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Attr::Left => "left",
            Attr::Top => "top",
            Attr::Right => "right",
            Attr::Bottom => "bottom",
            Attr::Width => "w",
            Attr::Height => "h",
        }
    }
}

impl FromStr for Attr {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => return Ok(Attr::Left),
            "T" | "t" => return Ok(Attr::Top),
            "R" | "r" => return Ok(Attr::Right),
            "B" | "b" => return Ok(Attr::Bottom),
            "W" | "w" => return Ok(Attr::Width),
            "H" | "h" => return Ok(Attr::Height),
            _ => {}
        }
        match s.to_ascii_lowercase().as_str() {
            "x" | "left" => Ok(Attr::Left),
            "y" | "top" => Ok(Attr::Top),
            "right" => Ok(Attr::Right),
            "bottom" => Ok(Attr::Bottom),
            "width" => Ok(Attr::Width),
            "height" => Ok(Attr::Height),
            _ => Err(ConstraintError::UnknownAttribute(s.to_string())),
        }
    }
}

/// A named variable `[component_]attr`.
///
/// ```text
/// "left"           -> (this,      Left)
/// "_top"           -> (parent,    Top)
/// "letters_bottom" -> ("letters", Bottom)
/// "row_head_w"     -> ("row_head", Width)   (split on the last '_')
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    pub component: String,
    pub attr: Attr,
}

impl Var {
    pub fn new(component: impl Into<String>, attr: Attr) -> Self {
        let component = component.into();
        let component = canonical_component(&component).to_string();
        Var { component, attr }
    }

    pub fn this(attr: Attr) -> Self {
        Var { component: THIS.to_string(), attr }
    }

    pub fn parent(attr: Attr) -> Self {
        Var { component: PARENT.to_string(), attr }
    }
}

impl FromStr for Var {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(attr) = s.parse::<Attr>() {
            return Ok(Var::this(attr));
        }
        let (component, attr) = s.rsplit_once('_').ok_or_else(|| ConstraintError::UnknownAttribute(s.to_string()))?;
        let attr: Attr = attr.parse()?;
        let component = if component.is_empty() { PARENT } else { component };
        Ok(Var::new(component, attr))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component.as_str() {
            THIS => f.write_str(self.attr.name()),
            PARENT => write!(f, "_{}", self.attr.name()),
            component => write!(f, "{}_{}", component, self.attr.name()),
        }
    }
}

/// Concrete variable values for evaluation.
pub type VarValues = HashMap<Var, i64>;

/// Insert every attribute of `rect` under `component`.
pub fn insert_rect(values: &mut VarValues, component: &str, rect: &Rect) {
    for attr in Attr::ALL {
        values.insert(Var::new(component, attr), attr.of(rect));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_component_prefixes() {
        assert_eq!("left".parse::<Var>().unwrap(), Var::this(Attr::Left));
        assert_eq!("x".parse::<Var>().unwrap(), Var::this(Attr::Left));
        assert_eq!("_top".parse::<Var>().unwrap(), Var::parent(Attr::Top));
        assert_eq!("letters_B".parse::<Var>().unwrap(), Var::new("letters", Attr::Bottom));
        assert_eq!("row_head_width".parse::<Var>().unwrap(), Var::new("row_head", Attr::Width));
        assert_eq!("parent_h".parse::<Var>().unwrap(), Var::parent(Attr::Height));
        assert_eq!("this_R".parse::<Var>().unwrap(), Var::this(Attr::Right));
        assert!("letters_depth".parse::<Var>().is_err());
        assert!("depth".parse::<Var>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["left", "_top", "letters_bottom", "a_b_w"] {
            assert_eq!(text.parse::<Var>().unwrap().to_string(), text);
        }
    }
}
