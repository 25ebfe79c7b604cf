//! Cheap-to-clone interned strings, used anywhere an identifier (a flow
//! name, a label value) is passed around and cloned across tasks.

/// An atomically-refcounted, immutable string. Clones are a pointer copy.
pub type Strng = arcstr::ArcStr;

/// Build a [`Strng`] from anything that derefs to `str`.
pub fn new(s: impl AsRef<str>) -> Strng {
	Strng::from(s.as_ref())
}
