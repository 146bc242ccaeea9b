use sequent_dom::Element;

/// How a replacement node reaches its member's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Relocate the replacement node itself. A node reused by `Cycle` is
    /// moved on first use and deep-cloned afterwards.
    Move,
    /// Insert a deep copy (attributes and descendants, no listeners) and leave
    /// the original untouched.
    #[default]
    Clone,
}

/// What happens to members beyond the end of the replacement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Matching {
    /// Start over from the first replacement.
    #[default]
    Cycle,
    /// Remove the member without replacing it.
    Remove,
}

/// Options for `become_with`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BecomeOptions {
    pub mode: Mode,
    pub matching: Matching,
}

impl BecomeOptions {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn matching(mut self, matching: Matching) -> Self {
        self.matching = matching;
        self
    }
}

/// Replaces the `index`-th member of a chain. An empty replacement list leaves
/// the member alone.
pub(crate) fn apply(
    member: &Element,
    index: usize,
    replacements: &[Element],
    options: BecomeOptions,
) -> sequent_dom::Result<()> {
    if replacements.is_empty() {
        return Ok(());
    }
    let source = match options.matching {
        Matching::Cycle => &replacements[index % replacements.len()],
        Matching::Remove => match replacements.get(index) {
            Some(source) => source,
            None => return member.remove(),
        },
    };
    let node = match options.mode {
        Mode::Move if index < replacements.len() => source.clone(),
        _ => source.clone_node(true)?,
    };
    member.replace_with(&node)
}
