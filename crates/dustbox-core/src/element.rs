//! Element identity: numeric IDs, string identifiers, colors and the
//! frozen registry the codec resolves against.
//!
//! Numeric IDs are a historical artifact of the on-disk formats and must
//! never be reordered; new elements append. The string identifier
//! (`DEFAULT_PT_<NAME>`) is the stable cross-build name embedded in the
//! save palette.

use std::collections::HashMap;

use crate::DEFAULT_TEMP;

/// Number of element slots in the standard set. Mod elements live at and
/// above this ID; several historical shift rules in the codec pivot on it.
pub const NORMAL_ELEMENT_COUNT: i32 = 161;

/// Total element slots, including the mod region and unused spares.
pub const ELEMENT_COUNT: i32 = 231;

/// Prefix of every built-in element identifier. Palette entries carrying
/// this prefix but naming no live slot are treated as permanently absent
/// rather than unknown.
pub const DEFAULT_IDENTIFIER_PREFIX: &str = "DEFAULT_PT_";

/// Element IDs referenced by the codec and its compatibility rules.
#[allow(missing_docs)]
pub mod ids {
    pub const NONE: i32 = 0;
    pub const DUST: i32 = 1;
    pub const WATR: i32 = 2;
    pub const OIL: i32 = 3;
    pub const FIRE: i32 = 4;
    pub const STNE: i32 = 5;
    pub const LAVA: i32 = 6;
    pub const GUNP: i32 = 7;
    pub const NITR: i32 = 8;
    pub const CLNE: i32 = 9;
    pub const GAS: i32 = 10;
    pub const PLEX: i32 = 11;
    pub const GOO: i32 = 12;
    pub const ICE: i32 = 13;
    pub const METL: i32 = 14;
    pub const SPRK: i32 = 15;
    pub const SNOW: i32 = 16;
    pub const WOOD: i32 = 17;
    pub const NEUT: i32 = 18;
    pub const PLUT: i32 = 19;
    pub const PLNT: i32 = 20;
    pub const ACID: i32 = 21;
    pub const VOID: i32 = 22;
    pub const WTRV: i32 = 23;
    pub const CNCT: i32 = 24;
    pub const DSTW: i32 = 25;
    pub const SALT: i32 = 26;
    pub const SLTW: i32 = 27;
    pub const DMND: i32 = 28;
    pub const BMTL: i32 = 29;
    pub const BRMT: i32 = 30;
    pub const PHOT: i32 = 31;
    pub const URAN: i32 = 32;
    pub const WAX: i32 = 33;
    pub const MWAX: i32 = 34;
    pub const PSCN: i32 = 35;
    pub const NSCN: i32 = 36;
    pub const LNTG: i32 = 37;
    pub const INSL: i32 = 38;
    pub const VACU: i32 = 39;
    pub const WHOL: i32 = 40;
    pub const RBDM: i32 = 41;
    pub const LRBD: i32 = 42;
    pub const NTCT: i32 = 43;
    pub const SAND: i32 = 44;
    pub const GLAS: i32 = 45;
    pub const PTCT: i32 = 46;
    pub const BGLA: i32 = 47;
    pub const THDR: i32 = 48;
    pub const PLSM: i32 = 49;
    pub const ETRD: i32 = 50;
    pub const NICE: i32 = 51;
    pub const NBLE: i32 = 52;
    pub const BTRY: i32 = 53;
    pub const LCRY: i32 = 54;
    pub const STKM: i32 = 55;
    pub const SWCH: i32 = 56;
    pub const SMKE: i32 = 57;
    pub const DESL: i32 = 58;
    pub const COAL: i32 = 59;
    pub const LOXY: i32 = 60;
    pub const OXYG: i32 = 61;
    pub const INWR: i32 = 62;
    pub const YEST: i32 = 63;
    pub const DYST: i32 = 64;
    pub const THRM: i32 = 65;
    pub const GLOW: i32 = 66;
    pub const BRCK: i32 = 67;
    pub const CFLM: i32 = 68;
    pub const FIRW: i32 = 69;
    pub const FUSE: i32 = 70;
    pub const FSEP: i32 = 71;
    pub const AMTR: i32 = 72;
    pub const BCOL: i32 = 73;
    pub const PCLN: i32 = 74;
    pub const HSWC: i32 = 75;
    pub const IRON: i32 = 76;
    pub const MORT: i32 = 77;
    /// Unified cellular-automaton element. IDs 79-89 are the retired
    /// dedicated automaton slots it replaced.
    pub const LIFE: i32 = 78;
    pub const SPNG: i32 = 90;
    pub const RIME: i32 = 91;
    pub const FOG: i32 = 92;
    pub const BCLN: i32 = 93;
    pub const LOVE: i32 = 94;
    pub const DEUT: i32 = 95;
    pub const WARP: i32 = 96;
    pub const PUMP: i32 = 97;
    pub const FWRK: i32 = 98;
    pub const PIPE: i32 = 99;
    pub const FRZZ: i32 = 100;
    pub const FRZW: i32 = 101;
    pub const GRAV: i32 = 102;
    pub const BIZR: i32 = 103;
    pub const BIZRG: i32 = 104;
    pub const BIZRS: i32 = 105;
    pub const INST: i32 = 106;
    pub const ISOZ: i32 = 107;
    pub const ISZS: i32 = 108;
    pub const PRTI: i32 = 109;
    pub const PRTO: i32 = 110;
    pub const PSTE: i32 = 111;
    pub const PSTS: i32 = 112;
    pub const ANAR: i32 = 113;
    pub const VINE: i32 = 114;
    pub const INVS: i32 = 115;
    pub const EQVE: i32 = 116;
    pub const SPWN2: i32 = 117;
    pub const BOYL: i32 = 118;
    pub const SPWN: i32 = 119;
    pub const STKM2: i32 = 120;
    pub const TTAN: i32 = 121;
    pub const EXOT: i32 = 122;
    pub const EMBR: i32 = 123;
    pub const BOMB: i32 = 124;
    pub const FILT: i32 = 125;
    pub const QRTZ: i32 = 126;
    pub const PQRT: i32 = 127;
    pub const EMP: i32 = 128;
    pub const BRAY: i32 = 129;
    pub const STOR: i32 = 130;
    pub const CONV: i32 = 131;
    pub const PBCN: i32 = 132;
    pub const TRON: i32 = 133;
    pub const DLAY: i32 = 134;
    pub const PSTN: i32 = 135;
    pub const CRAY: i32 = 136;
    pub const FRAY: i32 = 137;
    pub const DTEC: i32 = 138;
    pub const DRAY: i32 = 139;
    pub const SOAP: i32 = 140;
    pub const FIGH: i32 = 141;
    pub const RPEL: i32 = 142;
    pub const NWHL: i32 = 143;
    pub const HEAC: i32 = 144;
    pub const SAWD: i32 = 145;
    pub const POLO: i32 = 146;
    pub const RFRG: i32 = 147;
    pub const RFGL: i32 = 148;
    pub const LSNS: i32 = 149;
    pub const VIRS: i32 = 150;
    pub const VRSS: i32 = 151;
    pub const VRSG: i32 = 152;
    pub const WIRE: i32 = 153;
    pub const PPIP: i32 = 154;

    // Mod region starts at NORMAL_ELEMENT_COUNT.
    pub const MOVS: i32 = 161;
    pub const ANIM: i32 = 162;
    pub const LOLZ: i32 = 163;
}

/// One registry slot.
#[derive(Debug, Clone)]
pub struct ElementDef {
    pub name: &'static str,
    /// Stable cross-build identifier, `DEFAULT_PT_<NAME>` for built-ins.
    pub identifier: String,
    /// Base display color, packed `0xRRGGBB`.
    pub colour: u32,
    pub enabled: bool,
    /// Temperature assigned when a save revision predates per-particle
    /// temperature storage.
    pub default_temp: f32,
}

/// Frozen element lookup table. Built once at startup; the codec only
/// reads it.
pub struct ElementRegistry {
    defs: Vec<ElementDef>,
    by_identifier: HashMap<String, i32>,
}

/// (id, name, colour) for every defined slot. Gaps stay as disabled
/// placeholder slots.
const BUILTIN: &[(i32, &str, u32)] = &[
    (ids::DUST, "DUST", 0xFFE0A0),
    (ids::WATR, "WATR", 0x2030D0),
    (ids::OIL, "OIL", 0x404010),
    (ids::FIRE, "FIRE", 0xFF1000),
    (ids::STNE, "STNE", 0xA0A0A0),
    (ids::LAVA, "LAVA", 0xE05010),
    (ids::GUNP, "GUNP", 0xC0C0D0),
    (ids::NITR, "NITR", 0x20E010),
    (ids::CLNE, "CLNE", 0xFFD010),
    (ids::GAS, "GAS", 0xE0FF20),
    (ids::PLEX, "PLEX", 0xD080E0),
    (ids::GOO, "GOO", 0x804000),
    (ids::ICE, "ICE", 0xA0C0FF),
    (ids::METL, "METL", 0x404060),
    (ids::SPRK, "SPRK", 0xFFFF80),
    (ids::SNOW, "SNOW", 0xC0E0FF),
    (ids::WOOD, "WOOD", 0xC0A040),
    (ids::NEUT, "NEUT", 0x20E0FF),
    (ids::PLUT, "PLUT", 0x407020),
    (ids::PLNT, "PLNT", 0x0CAC00),
    (ids::ACID, "ACID", 0xED55FF),
    (ids::VOID, "VOID", 0x790B0B),
    (ids::WTRV, "WTRV", 0xA0A0FF),
    (ids::CNCT, "CNCT", 0xC0C0C0),
    (ids::DSTW, "DSTW", 0x1020C0),
    (ids::SALT, "SALT", 0xFFFFFF),
    (ids::SLTW, "SLTW", 0x4050F0),
    (ids::DMND, "DMND", 0xCCFFFF),
    (ids::BMTL, "BMTL", 0x505070),
    (ids::BRMT, "BRMT", 0x705060),
    (ids::PHOT, "PHOT", 0xFFFFFF),
    (ids::URAN, "URAN", 0x707020),
    (ids::WAX, "WAX", 0xF0F0BB),
    (ids::MWAX, "MWAX", 0xE0E0AA),
    (ids::PSCN, "PSCN", 0x805050),
    (ids::NSCN, "NSCN", 0x505080),
    (ids::LNTG, "LNTG", 0x80A0DF),
    (ids::INSL, "INSL", 0x9EA3B6),
    (ids::VACU, "VACU", 0x303030),
    (ids::WHOL, "WHOL", 0xEFEFEF),
    (ids::RBDM, "RBDM", 0xCCCCCC),
    (ids::LRBD, "LRBD", 0xAAAAAA),
    (ids::NTCT, "NTCT", 0x505040),
    (ids::SAND, "SAND", 0xFFD090),
    (ids::GLAS, "GLAS", 0x404040),
    (ids::PTCT, "PTCT", 0x405050),
    (ids::BGLA, "BGLA", 0x606060),
    (ids::THDR, "THDR", 0xFFFFA0),
    (ids::PLSM, "PLSM", 0xBB99FF),
    (ids::ETRD, "ETRD", 0x404040),
    (ids::NICE, "NICE", 0xC0E0FF),
    (ids::NBLE, "NBLE", 0xEB4917),
    (ids::BTRY, "BTRY", 0x858505),
    (ids::LCRY, "LCRY", 0x505050),
    (ids::STKM, "STKM", 0xFFE0A0),
    (ids::SWCH, "SWCH", 0x103B11),
    (ids::SMKE, "SMKE", 0x222222),
    (ids::DESL, "DESL", 0x440000),
    (ids::COAL, "COAL", 0x222222),
    (ids::LOXY, "LOXY", 0x80A0EF),
    (ids::OXYG, "OXYG", 0x80A0FF),
    (ids::INWR, "INWR", 0x544141),
    (ids::YEST, "YEST", 0xEEE0C0),
    (ids::DYST, "DYST", 0xBBB0A0),
    (ids::THRM, "THRM", 0xA08090),
    (ids::GLOW, "GLOW", 0x445464),
    (ids::BRCK, "BRCK", 0x808080),
    (ids::CFLM, "CFLM", 0x8080FF),
    (ids::FIRW, "FIRW", 0xFFA040),
    (ids::FUSE, "FUSE", 0x0A5706),
    (ids::FSEP, "FSEP", 0x63AD5F),
    (ids::AMTR, "AMTR", 0x808080),
    (ids::BCOL, "BCOL", 0x333333),
    (ids::PCLN, "PCLN", 0x3B3B0A),
    (ids::HSWC, "HSWC", 0x3B100A),
    (ids::IRON, "IRON", 0x707070),
    (ids::MORT, "MORT", 0xE0E0E0),
    (ids::LIFE, "LIFE", 0x0CAC00),
    (ids::SPNG, "SPNG", 0xFFBE30),
    (ids::RIME, "RIME", 0xCCCCCC),
    (ids::FOG, "FOG", 0x9B9B9B),
    (ids::BCLN, "BCLN", 0xFFD040),
    (ids::LOVE, "LOVE", 0xFF30FF),
    (ids::DEUT, "DEUT", 0x00153F),
    (ids::WARP, "WARP", 0x101010),
    (ids::PUMP, "PUMP", 0x0A0B1B),
    (ids::FWRK, "FWRK", 0x666666),
    (ids::PIPE, "PIPE", 0x444444),
    (ids::FRZZ, "FRZZ", 0xC0E0FF),
    (ids::FRZW, "FRZW", 0x1020C0),
    (ids::GRAV, "GRAV", 0x00EE00),
    (ids::BIZR, "BIZR", 0x00FF77),
    (ids::BIZRG, "BIZRG", 0x00FFBB),
    (ids::BIZRS, "BIZRS", 0x00B454),
    (ids::INST, "INST", 0x404039),
    (ids::ISOZ, "ISOZ", 0xAA30D0),
    (ids::ISZS, "ISZS", 0x662089),
    (ids::PRTI, "PRTI", 0xEB5917),
    (ids::PRTO, "PRTO", 0x0020EB),
    (ids::PSTE, "PSTE", 0xAA99AA),
    (ids::PSTS, "PSTS", 0x776677),
    (ids::ANAR, "ANAR", 0xFFFFEE),
    (ids::VINE, "VINE", 0x079A00),
    (ids::INVS, "INVS", 0x00CCCC),
    (ids::EQVE, "EQVE", 0x69D071),
    (ids::SPWN2, "SPWN2", 0xAAAAAA),
    (ids::BOYL, "BOYL", 0x0A320A),
    (ids::SPWN, "SPWN", 0xAAAAAA),
    (ids::STKM2, "STKM2", 0x6464FF),
    (ids::TTAN, "TTAN", 0x909090),
    (ids::EXOT, "EXOT", 0x404040),
    (ids::EMBR, "EMBR", 0xFF8840),
    (ids::BOMB, "BOMB", 0xFFF288),
    (ids::FILT, "FILT", 0x000056),
    (ids::QRTZ, "QRTZ", 0xAADDDD),
    (ids::PQRT, "PQRT", 0x88BBBB),
    (ids::EMP, "EMP", 0x66AAFF),
    (ids::BRAY, "BRAY", 0xFFFFFF),
    (ids::STOR, "STOR", 0x50DFDF),
    (ids::CONV, "CONV", 0x0AAB0A),
    (ids::PBCN, "PBCN", 0x3B1D0A),
    (ids::TRON, "TRON", 0xA9FF00),
    (ids::DLAY, "DLAY", 0x753590),
    (ids::PSTN, "PSTN", 0xAA9999),
    (ids::CRAY, "CRAY", 0xBBFF00),
    (ids::FRAY, "FRAY", 0x00BBFF),
    (ids::DTEC, "DTEC", 0xFD9D18),
    (ids::DRAY, "DRAY", 0xFFAA22),
    (ids::SOAP, "SOAP", 0xF5F5DC),
    (ids::FIGH, "FIGH", 0x000000),
    (ids::RPEL, "RPEL", 0xCCCC00),
    (ids::NWHL, "NWHL", 0x101010),
    (ids::HEAC, "HEAC", 0xCB6351),
    (ids::SAWD, "SAWD", 0xF0F0BB),
    (ids::POLO, "POLO", 0x506030),
    (ids::RFRG, "RFRG", 0x8AE1E1),
    (ids::RFGL, "RFGL", 0x8AA1C1),
    (ids::LSNS, "LSNS", 0x336699),
    (ids::VIRS, "VIRS", 0xFE11F6),
    (ids::VRSS, "VRSS", 0xD408CD),
    (ids::VRSG, "VRSG", 0xFE68FE),
    (ids::WIRE, "WIRE", 0xFFCC00),
    (ids::PPIP, "PPIP", 0x444466),
    (ids::MOVS, "MOVS", 0x0077FF),
    (ids::ANIM, "ANIM", 0xFF00FF),
    (ids::LOLZ, "LOLZ", 0x569212),
];

/// Elements whose legacy default temperature differs from room temperature.
const DEFAULT_TEMP_OVERRIDES: &[(i32, f32)] = &[
    (ids::FIRE, 983.15),
    (ids::LAVA, 2273.15),
    (ids::PLSM, 10273.15),
    (ids::CFLM, 373.15),
    (ids::ICE, 263.15),
    (ids::NICE, 33.15),
    (ids::SNOW, 263.15),
    (ids::LNTG, 70.15),
    (ids::LOXY, 80.0),
    (ids::SMKE, 443.15),
    (ids::THDR, 9000.0),
    (ids::WTRV, 395.15),
    (ids::FRZZ, 173.15),
];

impl ElementRegistry {
    /// The standard element set.
    pub fn builtin() -> Self {
        let mut defs: Vec<ElementDef> = (0..ELEMENT_COUNT)
            .map(|id| ElementDef {
                name: "",
                identifier: format!("{DEFAULT_IDENTIFIER_PREFIX}{id}"),
                colour: 0,
                enabled: false,
                default_temp: DEFAULT_TEMP,
            })
            .collect();
        for &(id, name, colour) in BUILTIN {
            let def = &mut defs[id as usize];
            def.name = name;
            def.identifier = format!("{DEFAULT_IDENTIFIER_PREFIX}{name}");
            def.colour = colour;
            def.enabled = true;
        }
        for &(id, temp) in DEFAULT_TEMP_OVERRIDES {
            defs[id as usize].default_temp = temp;
        }
        let by_identifier = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.enabled)
            .map(|(id, d)| (d.identifier.clone(), id as i32))
            .collect();
        ElementRegistry {
            defs,
            by_identifier,
        }
    }

    pub fn get(&self, id: i32) -> Option<&ElementDef> {
        if !(0..ELEMENT_COUNT).contains(&id) {
            return None;
        }
        Some(&self.defs[id as usize])
    }

    pub fn is_enabled(&self, id: i32) -> bool {
        self.get(id).is_some_and(|d| d.enabled)
    }

    /// Base color for an element, black for unknown slots.
    pub fn colour(&self, id: i32) -> u32 {
        self.get(id).map(|d| d.colour).unwrap_or(0)
    }

    pub fn default_temp(&self, id: i32) -> f32 {
        self.get(id).map(|d| d.default_temp).unwrap_or(DEFAULT_TEMP)
    }

    /// Resolve a string identifier to its current numeric ID.
    pub fn lookup_identifier(&self, identifier: &str) -> Option<i32> {
        self.by_identifier.get(identifier).copied()
    }

    /// Enabled slots in ascending ID order, for palette emission.
    pub fn iter_enabled(&self) -> impl Iterator<Item = (i32, &ElementDef)> {
        self.defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.enabled)
            .map(|(id, d)| (id as i32, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_match_table_positions() {
        let reg = ElementRegistry::builtin();
        assert_eq!(reg.get(ids::DUST).unwrap().name, "DUST");
        assert_eq!(reg.get(ids::SOAP).unwrap().name, "SOAP");
        assert_eq!(reg.get(ids::MOVS).unwrap().name, "MOVS");
        assert!(!reg.is_enabled(ids::NONE));
        assert!(!reg.is_enabled(85)); // retired automaton slot
    }

    #[test]
    fn identifier_round_trip() {
        let reg = ElementRegistry::builtin();
        let id = reg.lookup_identifier("DEFAULT_PT_SOAP").unwrap();
        assert_eq!(id, ids::SOAP);
        assert_eq!(reg.get(id).unwrap().identifier, "DEFAULT_PT_SOAP");
        assert!(reg.lookup_identifier("DEFAULT_PT_NOPE").is_none());
    }

    #[test]
    fn out_of_range_lookups_are_none() {
        let reg = ElementRegistry::builtin();
        assert!(reg.get(-1).is_none());
        assert!(reg.get(ELEMENT_COUNT).is_none());
        assert_eq!(reg.colour(-1), 0);
    }

    #[test]
    fn mod_region_starts_at_normal_count() {
        assert_eq!(ids::MOVS, NORMAL_ELEMENT_COUNT);
    }
}
