//! PDF object identifier.

use std::fmt;

/// Identifies an indirect object: object number plus generation number.
///
/// The pair is the address side of the cross-reference machinery: `N G obj`
/// headers, `N G R` references, and xref entries all carry one. Generations
/// only grow over a document's life. A freed number comes back one
/// generation higher, and the terminal generation 65535 marks a slot that is
/// never handed out again; object 0 sits there permanently as the head of
/// the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// The object number (> 0 for real indirect objects).
    pub number: u32,
    /// The generation number.
    pub generation: u16,
}

impl ObjectId {
    /// The permanent free-list head every cross-reference table carries:
    /// object 0 at the terminal generation.
    pub const FREE_LIST_HEAD: ObjectId = ObjectId {
        number: 0,
        generation: Self::TERMINAL_GENERATION,
    };

    /// The generation at which a freed number is never reincarnated.
    pub const TERMINAL_GENERATION: u16 = u16::MAX;

    /// A first-generation id, the common case for freshly written objects.
    #[inline]
    pub fn new(number: u32) -> Self {
        Self {
            number,
            generation: 0,
        }
    }

    /// An id at an explicit generation, as read back from an xref entry.
    #[inline]
    pub fn with_generation(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    /// True for object number 0, which never addresses a real object.
    pub fn is_free_list_head(&self) -> bool {
        self.number == 0
    }

    /// The id this slot would carry after being freed and reused: same
    /// number, next generation. Saturates at the terminal generation, which
    /// retires the number for good.
    pub fn reincarnated(&self) -> ObjectId {
        ObjectId {
            number: self.number,
            generation: self.generation.saturating_add(1),
        }
    }

    /// Reference syntax, e.g. `12 0 R`.
    pub fn reference_string(&self) -> String {
        format!("{} R", self)
    }

    /// Definition header syntax, e.g. `12 0 obj`.
    pub fn definition_string(&self) -> String {
        format!("{} obj", self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.generation)
    }
}

impl From<(u32, u16)> for ObjectId {
    fn from((number, generation): (u32, u16)) -> Self {
        Self { number, generation }
    }
}
