/// Column-name constants for every table the pipeline touches.
/// Single source of truth for loaders, stages and the renderer.

// ── Ballot columns (raw input) ──────────────────────────────────────────────
pub mod ballots {
    pub const DEPARTMENT_CODE: &str = "Department code";
    pub const REGISTERED: &str = "Registered";
    pub const ABSTENTIONS: &str = "Abstentions";
    pub const NULL: &str = "Null";
    pub const CHOICE_A: &str = "Choice A";
    pub const CHOICE_B: &str = "Choice B";

    /// Integer-valued tallies, in output order.
    pub const COUNTS: [&str; 5] = [REGISTERED, ABSTENTIONS, NULL, CHOICE_A, CHOICE_B];
}

// ── Region columns (raw input) ──────────────────────────────────────────────
pub mod regions {
    pub const CODE: &str = "code";
    pub const NAME: &str = "name";
}

// ── Department columns (raw input) ──────────────────────────────────────────
pub mod departments {
    pub const CODE: &str = "code";
    pub const NAME: &str = "name";
    pub const REGION_CODE: &str = "region_code";
}

// ── Administrative area columns (derived) ───────────────────────────────────
pub mod areas {
    pub const CODE_REG: &str = "code_reg";
    pub const NAME_REG: &str = "name_reg";
    pub const CODE_DEP: &str = "code_dep";
    pub const NAME_DEP: &str = "name_dep";

    pub const ALL: [&str; 4] = [CODE_REG, NAME_REG, CODE_DEP, NAME_DEP];
}

// ── Geometry columns (GeoJSON input) ────────────────────────────────────────
pub mod geometry {
    pub const CODE: &str = "code";
    pub const NAME: &str = "name";
    pub const GEOMETRY: &str = "geometry";
}

// ── Derived result columns ──────────────────────────────────────────────────
pub mod result {
    pub const RATIO: &str = "ratio";
}

// ── Department code conventions ─────────────────────────────────────────────
pub mod codes {
    /// Prefix marking departments outside the mainland (overseas, abroad).
    pub const OVERSEAS_PREFIX: &str = "Z";
}
