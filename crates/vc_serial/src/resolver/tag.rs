use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::info::TypeShape;

// -----------------------------------------------------------------------------
// TypeTag

/// A tree of stable keys identifying a closed type.
///
/// # Examples
///
/// ```
/// use vc_serial::info::Typed;
/// use vc_serial::resolver::TypeTag;
///
/// let tag = TypeTag::from_shape(&Vec::<Vec<u8>>::type_shape());
/// assert_eq!(tag.preorder(), ["list", "list", "u1"]);
/// assert_eq!(tag.to_string(), "list<list<u1>>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: String,
    args: Vec<TypeTag>,
}

impl TypeTag {
    #[inline]
    pub fn new(id: impl Into<String>, args: Vec<TypeTag>) -> Self {
        Self {
            id: id.into(),
            args,
        }
    }

    pub fn from_shape(shape: &TypeShape) -> Self {
        Self {
            id: String::from(shape.stable_key()),
            args: shape.args().iter().map(Self::from_shape).collect(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn args(&self) -> &[TypeTag] {
        &self.args
    }

    /// Ids in preorder: the root first, then each argument subtree.
    pub fn preorder(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.id);
        for arg in &self.args {
            arg.walk(out);
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        if let Some((first, rest)) = self.args.split_first() {
            write!(f, "<{first}")?;
            for arg in rest {
                write!(f, ", {arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}
