//! Opcode table
//!
//! Every byte value maps to at most one [`OpcodeInfo`]. The table is built at
//! compile time from three sources:
//!
//! - the six packed families at `0..48`, eight codes each,
//! - the direct constant range `192..=255`,
//! - the flat list of dedicated operations in [`SIMPLE_OPCODES`].
//!
//! Bytes not covered by any of those stay unassigned and decode to
//! [`BytecodeError::InvalidOpcode`](crate::BytecodeError::InvalidOpcode).

use serde::{Deserialize, Serialize};

/// Operations understood by the machine.
///
/// Packed families use their family base as discriminant; every other
/// variant uses the byte it is encoded as, except [`Opcode::Constant`],
/// which owns the whole `192..=255` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Packed families ====================
    /// Push a copy of the Nth slot from the top (0 = top)
    StackRef = 0,
    /// Push the dynamic value of constants\[n\]
    VarRef = 8,
    /// Pop into the dynamic value of constants\[n\]
    VarSet = 16,
    /// Pop and push a new dynamic binding for constants\[n\]
    VarBind = 24,
    /// Call the function beneath the top n arguments
    Call = 32,
    /// Pop n dynamic bindings
    Unbind = 40,

    // ==================== Lists and predicates ====================
    /// (nth n list)
    Nth = 56,
    /// (symbolp x)
    Symbolp = 57,
    /// (consp x)
    Consp = 58,
    /// (stringp x)
    Stringp = 59,
    /// (listp x)
    Listp = 60,
    /// (eq a b)
    Eq = 61,
    /// (memq elt list)
    Memq = 62,
    /// (not x)
    Not = 63,
    /// (car x)
    Car = 64,
    /// (cdr x)
    Cdr = 65,
    /// (cons a b)
    Cons = 66,
    /// (list a)
    List1 = 67,
    /// (list a b)
    List2 = 68,
    /// (list a b c)
    List3 = 69,
    /// (list a b c d)
    List4 = 70,
    /// (length seq)
    Length = 71,
    /// (aref array idx)
    Aref = 72,
    /// (aset array idx value)
    Aset = 73,
    /// (symbol-value sym)
    SymbolValue = 74,
    /// (symbol-function sym)
    SymbolFunction = 75,
    /// (set sym value)
    Set = 76,
    /// (fset sym def)
    Fset = 77,
    /// (get sym prop)
    Get = 78,
    /// (substring str from to)
    Substring = 79,
    /// (concat a b)
    Concat2 = 80,
    /// (concat a b c)
    Concat3 = 81,
    /// (concat a b c d)
    Concat4 = 82,

    // ==================== Arithmetic ====================
    /// (1- n)
    Sub1 = 83,
    /// (1+ n)
    Add1 = 84,
    /// (= a b)
    Eqlsign = 85,
    /// (> a b)
    Gtr = 86,
    /// (< a b)
    Lss = 87,
    /// (<= a b)
    Leq = 88,
    /// (>= a b)
    Geq = 89,
    /// (- a b)
    Diff = 90,
    /// (- n)
    Negate = 91,
    /// (+ a b)
    Plus = 92,
    /// (max a b)
    Max = 93,
    /// (min a b)
    Min = 94,
    /// (* a b)
    Mult = 95,

    // ==================== Control flow ====================
    /// Push constants\[n\] (2-byte index)
    Constant2 = 129,
    /// Jump to an absolute offset
    Goto = 130,
    /// Pop; jump if nil
    GotoIfNil = 131,
    /// Pop; jump if non-nil
    GotoIfNonNil = 132,
    /// Jump keeping top if nil, otherwise pop
    GotoIfNilElsePop = 133,
    /// Jump keeping top if non-nil, otherwise pop
    GotoIfNonNilElsePop = 134,
    /// Pop the result and leave the activation
    Return = 135,
    /// Pop and drop the top value
    Discard = 136,
    /// Push a copy of the top value
    Dup = 137,

    // ==================== Strings and sequences ====================
    /// (upcase x)
    Upcase = 150,
    /// (downcase x)
    Downcase = 151,
    /// (string= a b)
    StringEqlsign = 152,
    /// (string< a b)
    StringLss = 153,
    /// (equal a b)
    Equal = 154,
    /// (nthcdr n list)
    Nthcdr = 155,
    /// (elt seq n)
    Elt = 156,
    /// (member elt list)
    Member = 157,
    /// (assq key alist)
    Assq = 158,
    /// (nreverse list)
    Nreverse = 159,
    /// (setcar cell value)
    Setcar = 160,
    /// (setcdr cell value)
    Setcdr = 161,
    /// (car-safe x)
    CarSafe = 162,
    /// (cdr-safe x)
    CdrSafe = 163,
    /// (nconc a b)
    Nconc = 164,
    /// (/ a b)
    Quo = 165,
    /// (% a b)
    Rem = 166,
    /// (numberp x)
    Numberp = 167,
    /// (integerp x)
    Integerp = 168,

    // ==================== Variadic and stack ====================
    /// (list ...) over the top n values
    ListN = 175,
    /// (concat ...) over the top n values
    ConcatN = 176,
    /// Pop into the slot n below the top
    StackSet = 178,
    /// Pop into the slot n below the top (2-byte operand)
    StackSet2 = 179,
    /// Drop n values; bit 0x80 keeps the top value
    DiscardN = 182,

    /// Push constants\[code - 192\]
    Constant = 192,
}

/// How an opcode carries its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    /// No operand
    None,
    /// Operand encoded in the opcode byte itself
    Packed(u8),
    /// One immediate byte follows
    Byte,
    /// Two immediate bytes follow, little-endian
    Word,
}

impl OperandKind {
    /// Number of bytes an instruction of this kind occupies
    #[inline]
    pub const fn instruction_len(self) -> usize {
        match self {
            Self::None | Self::Packed(_) => 1,
            Self::Byte => 2,
            Self::Word => 3,
        }
    }
}

/// Descriptor for one assigned opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Raw byte value
    pub code: u8,
    /// Operation encoded by the byte
    pub opcode: Opcode,
    /// Where the operand lives
    pub operand: OperandKind,
    /// First byte of the packed family, if the byte belongs to one
    pub family_base: Option<u8>,
}

/// The six packed families, in encoding order
pub const PACKED_FAMILIES: [Opcode; 6] = [
    Opcode::StackRef,
    Opcode::VarRef,
    Opcode::VarSet,
    Opcode::VarBind,
    Opcode::Call,
    Opcode::Unbind,
];

/// Codes per packed family
pub const FAMILY_SIZE: u8 = 8;

/// Family offsets below this value carry the operand in the opcode byte
pub const FAMILY_INLINE_LIMIT: u8 = 6;

/// First byte of the direct constant range
pub const CONSTANT_BASE: u8 = Opcode::Constant as u8;

/// Dedicated operations and the operand each takes
pub const SIMPLE_OPCODES: [(Opcode, OperandKind); 73] = [
    (Opcode::Nth, OperandKind::None),
    (Opcode::Symbolp, OperandKind::None),
    (Opcode::Consp, OperandKind::None),
    (Opcode::Stringp, OperandKind::None),
    (Opcode::Listp, OperandKind::None),
    (Opcode::Eq, OperandKind::None),
    (Opcode::Memq, OperandKind::None),
    (Opcode::Not, OperandKind::None),
    (Opcode::Car, OperandKind::None),
    (Opcode::Cdr, OperandKind::None),
    (Opcode::Cons, OperandKind::None),
    (Opcode::List1, OperandKind::None),
    (Opcode::List2, OperandKind::None),
    (Opcode::List3, OperandKind::None),
    (Opcode::List4, OperandKind::None),
    (Opcode::Length, OperandKind::None),
    (Opcode::Aref, OperandKind::None),
    (Opcode::Aset, OperandKind::None),
    (Opcode::SymbolValue, OperandKind::None),
    (Opcode::SymbolFunction, OperandKind::None),
    (Opcode::Set, OperandKind::None),
    (Opcode::Fset, OperandKind::None),
    (Opcode::Get, OperandKind::None),
    (Opcode::Substring, OperandKind::None),
    (Opcode::Concat2, OperandKind::None),
    (Opcode::Concat3, OperandKind::None),
    (Opcode::Concat4, OperandKind::None),
    (Opcode::Sub1, OperandKind::None),
    (Opcode::Add1, OperandKind::None),
    (Opcode::Eqlsign, OperandKind::None),
    (Opcode::Gtr, OperandKind::None),
    (Opcode::Lss, OperandKind::None),
    (Opcode::Leq, OperandKind::None),
    (Opcode::Geq, OperandKind::None),
    (Opcode::Diff, OperandKind::None),
    (Opcode::Negate, OperandKind::None),
    (Opcode::Plus, OperandKind::None),
    (Opcode::Max, OperandKind::None),
    (Opcode::Min, OperandKind::None),
    (Opcode::Mult, OperandKind::None),
    (Opcode::Constant2, OperandKind::Word),
    (Opcode::Goto, OperandKind::Word),
    (Opcode::GotoIfNil, OperandKind::Word),
    (Opcode::GotoIfNonNil, OperandKind::Word),
    (Opcode::GotoIfNilElsePop, OperandKind::Word),
    (Opcode::GotoIfNonNilElsePop, OperandKind::Word),
    (Opcode::Return, OperandKind::None),
    (Opcode::Discard, OperandKind::None),
    (Opcode::Dup, OperandKind::None),
    (Opcode::Upcase, OperandKind::None),
    (Opcode::Downcase, OperandKind::None),
    (Opcode::StringEqlsign, OperandKind::None),
    (Opcode::StringLss, OperandKind::None),
    (Opcode::Equal, OperandKind::None),
    (Opcode::Nthcdr, OperandKind::None),
    (Opcode::Elt, OperandKind::None),
    (Opcode::Member, OperandKind::None),
    (Opcode::Assq, OperandKind::None),
    (Opcode::Nreverse, OperandKind::None),
    (Opcode::Setcar, OperandKind::None),
    (Opcode::Setcdr, OperandKind::None),
    (Opcode::CarSafe, OperandKind::None),
    (Opcode::CdrSafe, OperandKind::None),
    (Opcode::Nconc, OperandKind::None),
    (Opcode::Quo, OperandKind::None),
    (Opcode::Rem, OperandKind::None),
    (Opcode::Numberp, OperandKind::None),
    (Opcode::Integerp, OperandKind::None),
    (Opcode::ListN, OperandKind::Byte),
    (Opcode::ConcatN, OperandKind::Byte),
    (Opcode::StackSet, OperandKind::Byte),
    (Opcode::StackSet2, OperandKind::Word),
    (Opcode::DiscardN, OperandKind::Byte),
];

const fn build_table() -> [Option<OpcodeInfo>; 256] {
    let mut table: [Option<OpcodeInfo>; 256] = [None; 256];

    let mut f = 0;
    while f < PACKED_FAMILIES.len() {
        let opcode = PACKED_FAMILIES[f];
        let base = opcode as u8;
        let mut offset = 0u8;
        while offset < FAMILY_SIZE {
            let operand = if offset < FAMILY_INLINE_LIMIT {
                OperandKind::Packed(offset)
            } else if offset == FAMILY_INLINE_LIMIT {
                OperandKind::Byte
            } else {
                OperandKind::Word
            };
            let code = base + offset;
            table[code as usize] = Some(OpcodeInfo {
                code,
                opcode,
                operand,
                family_base: Some(base),
            });
            offset += 1;
        }
        f += 1;
    }

    let mut i = 0;
    while i < SIMPLE_OPCODES.len() {
        let (opcode, operand) = SIMPLE_OPCODES[i];
        let code = opcode as u8;
        table[code as usize] = Some(OpcodeInfo {
            code,
            opcode,
            operand,
            family_base: None,
        });
        i += 1;
    }

    let mut code = CONSTANT_BASE as usize;
    while code < 256 {
        table[code] = Some(OpcodeInfo {
            code: code as u8,
            opcode: Opcode::Constant,
            operand: OperandKind::Packed(code as u8 - CONSTANT_BASE),
            family_base: None,
        });
        code += 1;
    }

    table
}

/// Descriptor table indexed by opcode byte
pub static OPCODE_TABLE: [Option<OpcodeInfo>; 256] = build_table();

impl Opcode {
    /// Look up the descriptor for a raw byte
    #[inline]
    pub fn info(byte: u8) -> Option<&'static OpcodeInfo> {
        OPCODE_TABLE[byte as usize].as_ref()
    }

    /// Convert from raw byte
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::info(byte).map(|info| info.opcode)
    }

    /// First byte encoding this opcode (the family base for packed families)
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether this opcode is one of the six packed families
    #[inline]
    pub fn is_packed_family(self) -> bool {
        PACKED_FAMILIES.contains(&self)
    }

    /// Whether this opcode transfers control to its operand
    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::Goto
                | Self::GotoIfNil
                | Self::GotoIfNonNil
                | Self::GotoIfNilElsePop
                | Self::GotoIfNonNilElsePop
        )
    }

    /// Net change in operand-stack depth when the instruction falls through.
    ///
    /// Conditional jumps that keep the top value when taken report the
    /// fall-through effect.
    pub fn stack_effect(self, operand: u16) -> i32 {
        let n = operand as i32;
        match self {
            Self::StackRef | Self::VarRef | Self::Constant | Self::Constant2 | Self::Dup => 1,
            Self::VarSet | Self::VarBind => -1,
            Self::Call => -n,
            Self::Unbind | Self::Goto => 0,
            Self::ListN | Self::ConcatN => 1 - n,
            Self::DiscardN => -((operand & 0x7F) as i32),
            Self::Symbolp
            | Self::Consp
            | Self::Stringp
            | Self::Listp
            | Self::Not
            | Self::Car
            | Self::Cdr
            | Self::List1
            | Self::Length
            | Self::SymbolValue
            | Self::SymbolFunction
            | Self::Sub1
            | Self::Add1
            | Self::Negate
            | Self::Upcase
            | Self::Downcase
            | Self::Nreverse
            | Self::CarSafe
            | Self::CdrSafe
            | Self::Numberp
            | Self::Integerp => 0,
            Self::List3 | Self::Concat3 | Self::Aset | Self::Substring => -2,
            Self::List4 | Self::Concat4 => -3,
            Self::Nth
            | Self::Eq
            | Self::Memq
            | Self::Cons
            | Self::List2
            | Self::Aref
            | Self::Set
            | Self::Fset
            | Self::Get
            | Self::Concat2
            | Self::Eqlsign
            | Self::Gtr
            | Self::Lss
            | Self::Leq
            | Self::Geq
            | Self::Diff
            | Self::Plus
            | Self::Max
            | Self::Min
            | Self::Mult
            | Self::GotoIfNil
            | Self::GotoIfNonNil
            | Self::GotoIfNilElsePop
            | Self::GotoIfNonNilElsePop
            | Self::Return
            | Self::Discard
            | Self::StringEqlsign
            | Self::StringLss
            | Self::Equal
            | Self::Nthcdr
            | Self::Elt
            | Self::Member
            | Self::Assq
            | Self::Setcar
            | Self::Setcdr
            | Self::Nconc
            | Self::Quo
            | Self::Rem
            | Self::StackSet
            | Self::StackSet2 => -1,
        }
    }

    /// Mnemonic used by the disassembler
    pub const fn name(self) -> &'static str {
        match self {
            Self::StackRef => "stack-ref",
            Self::VarRef => "varref",
            Self::VarSet => "varset",
            Self::VarBind => "varbind",
            Self::Call => "call",
            Self::Unbind => "unbind",
            Self::Nth => "nth",
            Self::Symbolp => "symbolp",
            Self::Consp => "consp",
            Self::Stringp => "stringp",
            Self::Listp => "listp",
            Self::Eq => "eq",
            Self::Memq => "memq",
            Self::Not => "not",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::Cons => "cons",
            Self::List1 => "list1",
            Self::List2 => "list2",
            Self::List3 => "list3",
            Self::List4 => "list4",
            Self::Length => "length",
            Self::Aref => "aref",
            Self::Aset => "aset",
            Self::SymbolValue => "symbol-value",
            Self::SymbolFunction => "symbol-function",
            Self::Set => "set",
            Self::Fset => "fset",
            Self::Get => "get",
            Self::Substring => "substring",
            Self::Concat2 => "concat2",
            Self::Concat3 => "concat3",
            Self::Concat4 => "concat4",
            Self::Sub1 => "sub1",
            Self::Add1 => "add1",
            Self::Eqlsign => "eqlsign",
            Self::Gtr => "gtr",
            Self::Lss => "lss",
            Self::Leq => "leq",
            Self::Geq => "geq",
            Self::Diff => "diff",
            Self::Negate => "negate",
            Self::Plus => "plus",
            Self::Max => "max",
            Self::Min => "min",
            Self::Mult => "mult",
            Self::Constant2 => "constant2",
            Self::Goto => "goto",
            Self::GotoIfNil => "goto-if-nil",
            Self::GotoIfNonNil => "goto-if-not-nil",
            Self::GotoIfNilElsePop => "goto-if-nil-else-pop",
            Self::GotoIfNonNilElsePop => "goto-if-not-nil-else-pop",
            Self::Return => "return",
            Self::Discard => "discard",
            Self::Dup => "dup",
            Self::Upcase => "upcase",
            Self::Downcase => "downcase",
            Self::StringEqlsign => "string=",
            Self::StringLss => "string<",
            Self::Equal => "equal",
            Self::Nthcdr => "nthcdr",
            Self::Elt => "elt",
            Self::Member => "member",
            Self::Assq => "assq",
            Self::Nreverse => "nreverse",
            Self::Setcar => "setcar",
            Self::Setcdr => "setcdr",
            Self::CarSafe => "car-safe",
            Self::CdrSafe => "cdr-safe",
            Self::Nconc => "nconc",
            Self::Quo => "quo",
            Self::Rem => "rem",
            Self::Numberp => "numberp",
            Self::Integerp => "integerp",
            Self::ListN => "listN",
            Self::ConcatN => "concatN",
            Self::StackSet => "stack-set",
            Self::StackSet2 => "stack-set2",
            Self::DiscardN => "discardN",
            Self::Constant => "constant",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
