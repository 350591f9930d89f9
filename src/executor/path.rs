use std::{fmt, sync::Arc};

use arcstr::ArcStr;

/// Single step of a [`Path`] into the response.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathSegment {
    /// Response key of a field.
    Field(ArcStr),
    /// Position inside a list.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Location of a value in the response, as an immutable linked list.
///
/// Extending a path shares the prefix with the original, so paths of sibling
/// fields cost one allocation each.
#[derive(Clone, Default)]
pub struct Path(Option<Arc<PathNode>>);

struct PathNode {
    segment: PathSegment,
    parent: Path,
    len: usize,
}

impl Path {
    /// Empty path of the response root.
    pub fn root() -> Self {
        Self(None)
    }

    /// Path of a field below this one.
    #[must_use]
    pub fn field(&self, key: ArcStr) -> Self {
        self.push(PathSegment::Field(key))
    }

    /// Path of a list item below this one.
    #[must_use]
    pub fn index(&self, idx: usize) -> Self {
        self.push(PathSegment::Index(idx))
    }

    fn push(&self, segment: PathSegment) -> Self {
        Self(Some(Arc::new(PathNode {
            segment,
            parent: self.clone(),
            len: self.len() + 1,
        })))
    }

    /// Number of segments.
    pub(crate) fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |n| n.len)
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.as_ref().map(|n| &n.segment)
    }

    /// Number of field segments, i.e. the selection depth.
    pub(crate) fn depth(&self) -> usize {
        self.iter()
            .filter(|s| matches!(s, PathSegment::Field(_)))
            .count()
    }

    /// Iterates the segments from the last one up to the root.
    fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        let mut cur = self.0.as_deref();
        std::iter::from_fn(move || {
            let node = cur?;
            cur = node.parent.0.as_deref();
            Some(&node.segment)
        })
    }

    /// Segments from the root down.
    pub fn to_vec(&self) -> Vec<PathSegment> {
        let mut segments = self.iter().cloned().collect::<Vec<_>>();
        segments.reverse();
        segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.to_vec().iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}
