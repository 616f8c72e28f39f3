//! Document permissions for the /P entry.

use bitflags::bitflags;

bitflags! {
    /// Individual permission bits (PDF Reference, standard security handler).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PermissionFlags: u32 {
        /// Bit 3: print.
        const PRINT = 1 << 2;
        /// Bit 4: modify contents.
        const MODIFY = 1 << 3;
        /// Bit 5: copy text and graphics.
        const COPY = 1 << 4;
        /// Bit 6: add or modify annotations, fill forms.
        const ANNOTATE = 1 << 5;
        /// Bit 9: fill form fields.
        const FILL_FORMS = 1 << 8;
        /// Bit 10: extract for accessibility.
        const EXTRACT = 1 << 9;
        /// Bit 11: assemble (insert, rotate, delete pages).
        const ASSEMBLE = 1 << 10;
        /// Bit 12: print at full quality.
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

// All bits outside the defined ones must read as 1.
const RESERVED_MASK: u32 = 0xFFFF_F0C0;

/// PDF document permissions.
///
/// Wraps the raw /P flag word; reserved bits are always set so the value
/// round-trips through signed 32-bit storage the way consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    flags: PermissionFlags,
}

impl Permissions {
    /// Creates permissions with every operation denied.
    pub fn none() -> Self {
        Self {
            flags: PermissionFlags::empty(),
        }
    }

    /// Creates permissions with every operation allowed.
    pub fn all() -> Self {
        Self {
            flags: PermissionFlags::all(),
        }
    }

    /// Reconstructs permissions from a raw /P value.
    pub fn from_p_value(p: i64) -> Self {
        Self {
            flags: PermissionFlags::from_bits_truncate(p as u32),
        }
    }

    /// Allow or deny printing (both qualities).
    pub fn allow_printing(mut self, allow: bool) -> Self {
        self.flags.set(
            PermissionFlags::PRINT | PermissionFlags::PRINT_HIGH_QUALITY,
            allow,
        );
        self
    }

    /// Allow or deny modifying document contents.
    pub fn allow_modifying(mut self, allow: bool) -> Self {
        self.flags.set(PermissionFlags::MODIFY, allow);
        self
    }

    /// Allow or deny copying text and graphics.
    pub fn allow_copying(mut self, allow: bool) -> Self {
        self.flags.set(PermissionFlags::COPY, allow);
        self
    }

    /// Allow or deny annotations and form filling.
    pub fn allow_annotating(mut self, allow: bool) -> Self {
        self.flags
            .set(PermissionFlags::ANNOTATE | PermissionFlags::FILL_FORMS, allow);
        self
    }

    /// Allow or deny extraction for accessibility.
    pub fn allow_extraction(mut self, allow: bool) -> Self {
        self.flags.set(PermissionFlags::EXTRACT, allow);
        self
    }

    /// Allow or deny page assembly.
    pub fn allow_assembly(mut self, allow: bool) -> Self {
        self.flags.set(PermissionFlags::ASSEMBLE, allow);
        self
    }

    /// Tests a single permission.
    pub fn allows(&self, flag: PermissionFlags) -> bool {
        self.flags.contains(flag)
    }

    /// The signed /P value with reserved bits forced on.
    pub fn p_value(&self) -> i32 {
        (self.flags.bits() | RESERVED_MASK) as i32
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_denies_everything() {
        let p = Permissions::none();
        assert!(!p.allows(PermissionFlags::PRINT));
        assert!(!p.allows(PermissionFlags::MODIFY));
    }

    #[test]
    fn test_p_value_is_negative() {
        // reserved high bits force the sign bit
        assert!(Permissions::none().p_value() < 0);
        assert!(Permissions::all().p_value() < 0);
    }

    #[test]
    fn test_builder() {
        let p = Permissions::none()
            .allow_printing(true)
            .allow_copying(false)
            .allow_annotating(true);
        assert!(p.allows(PermissionFlags::PRINT));
        assert!(p.allows(PermissionFlags::PRINT_HIGH_QUALITY));
        assert!(!p.allows(PermissionFlags::COPY));
        assert!(p.allows(PermissionFlags::FILL_FORMS));
    }

    #[test]
    fn test_p_value_roundtrip() {
        let p = Permissions::none().allow_printing(true).allow_extraction(true);
        let restored = Permissions::from_p_value(p.p_value() as i64);
        assert_eq!(restored.p_value(), p.p_value());
        assert!(restored.allows(PermissionFlags::EXTRACT));
    }
}
