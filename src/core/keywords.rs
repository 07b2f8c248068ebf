// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Directive and miscellaneous keyword tables per dialect.

use crate::core::dialect::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Directive,
    /// Memory size keywords such as `DWORD` or `XMMWORD`.
    Size,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyword {
    pub name: &'static str,
    pub kind: KeywordKind,
    pub description: &'static str,
}

macro_rules! keywords {
    ($kind:ident: $($name:literal => $descr:literal),+ $(,)?) => {
        &[$(Keyword { name: $name, kind: KeywordKind::$kind, description: $descr }),+]
    };
}

const MASM_DIRECTIVES: &[Keyword] = keywords! { Directive:
    "PROC" => "Start of a procedure",
    "ENDP" => "End of a procedure",
    "PROTO" => "Prototype of a procedure",
    "LABEL" => "Label with an explicit type",
    "EQU" => "Symbolic constant",
    "TEXTEQU" => "Text macro",
    "MACRO" => "Start of a macro definition",
    "ENDM" => "End of a macro definition",
    "INCLUDE" => "Insert the contents of a source file",
    "INCLUDELIB" => "Link with a library",
    "EXTERN" => "Symbol defined in another module",
    "EXTRN" => "Symbol defined in another module",
    "EXTERNDEF" => "Symbol that may be defined in another module",
    "PUBLIC" => "Export a symbol",
    "SEGMENT" => "Start of a segment",
    "ENDS" => "End of a segment or structure",
    "STRUCT" => "Start of a structure",
    "STRUC" => "Start of a structure",
    "UNION" => "Start of a union",
    "RECORD" => "Bit field record",
    "TYPEDEF" => "Type alias",
    "ASSUME" => "Segment register assumption",
    "ALIGN" => "Align the location counter",
    "ORG" => "Set the location counter",
    "END" => "End of the source file",
    "OPTION" => "Assembler option",
    "INVOKE" => "Call a procedure with arguments",
    "LOCAL" => "Procedure local variable",
    "USES" => "Registers saved by a procedure",
    "DB" => "Define byte",
    "DW" => "Define word",
    "DD" => "Define doubleword",
    "DQ" => "Define quadword",
    "DT" => "Define ten bytes",
    "IF" => "Conditional assembly",
    "ELSE" => "Conditional assembly alternative",
    "ENDIF" => "End of conditional assembly",
    "REPEAT" => "Repeat block",
    "WHILE" => "Conditional repeat block",
    "FOR" => "Repeat block over a list",
    ".DATA" => "Start of the initialised data segment",
    ".DATA?" => "Start of the uninitialised data segment",
    ".CODE" => "Start of the code segment",
    ".CONST" => "Start of the constant data segment",
    ".MODEL" => "Memory model",
    ".STACK" => "Stack size",
    ".386" => "Enable 80386 instructions",
    ".486" => "Enable 80486 instructions",
    ".586" => "Enable Pentium instructions",
    ".686" => "Enable Pentium Pro instructions",
    ".MMX" => "Enable MMX instructions",
    ".XMM" => "Enable SSE instructions",
};

const NASM_DIRECTIVES: &[Keyword] = keywords! { Directive:
    "SECTION" => "Switch output section",
    "SEGMENT" => "Switch output section",
    "GLOBAL" => "Export a symbol",
    "EXTERN" => "Symbol defined in another module",
    "COMMON" => "Common data area",
    "BITS" => "Target processor mode",
    "USE16" => "16-bit processor mode",
    "USE32" => "32-bit processor mode",
    "USE64" => "64-bit processor mode",
    "DEFAULT" => "Change assembler defaults",
    "CPU" => "Restrict assembly to a processor",
    "ORG" => "Binary file origin",
    "ALIGN" => "Align the location counter",
    "ALIGNB" => "Align with reserved space",
    "TIMES" => "Repeat an instruction or data",
    "EQU" => "Symbolic constant",
    "DB" => "Define byte",
    "DW" => "Define word",
    "DD" => "Define doubleword",
    "DQ" => "Define quadword",
    "DT" => "Define ten bytes",
    "DO" => "Define octoword",
    "DY" => "Define 32 bytes",
    "DZ" => "Define 64 bytes",
    "RESB" => "Reserve bytes",
    "RESW" => "Reserve words",
    "RESD" => "Reserve doublewords",
    "RESQ" => "Reserve quadwords",
    "REST" => "Reserve ten-byte values",
    "INCBIN" => "Include a binary file",
    "STRUC" => "Start of a structure",
    "ENDSTRUC" => "End of a structure",
    "ISTRUC" => "Instance of a structure",
    "IEND" => "End of a structure instance",
    "AT" => "Field of a structure instance",
    "%DEFINE" => "Single-line macro",
    "%UNDEF" => "Remove a single-line macro",
    "%MACRO" => "Start of a multi-line macro",
    "%ENDMACRO" => "End of a multi-line macro",
    "%INCLUDE" => "Insert the contents of a source file",
    "%IF" => "Conditional assembly",
    "%IFDEF" => "Assemble if a macro is defined",
    "%ELSE" => "Conditional assembly alternative",
    "%ENDIF" => "End of conditional assembly",
    "%REP" => "Repeat block",
    "%ENDREP" => "End of a repeat block",
};

const GAS_DIRECTIVES: &[Keyword] = keywords! { Directive:
    ".TEXT" => "Switch to the text section",
    ".DATA" => "Switch to the data section",
    ".BSS" => "Switch to the bss section",
    ".SECTION" => "Switch output section",
    ".GLOBL" => "Export a symbol",
    ".GLOBAL" => "Export a symbol",
    ".EXTERN" => "Symbol defined in another module",
    ".BYTE" => "Emit bytes",
    ".WORD" => "Emit 16-bit values",
    ".SHORT" => "Emit 16-bit values",
    ".LONG" => "Emit 32-bit values",
    ".INT" => "Emit 32-bit values",
    ".QUAD" => "Emit 64-bit values",
    ".ASCII" => "Emit a string",
    ".ASCIZ" => "Emit a zero terminated string",
    ".STRING" => "Emit a zero terminated string",
    ".ALIGN" => "Align the location counter",
    ".BALIGN" => "Align to a byte boundary",
    ".P2ALIGN" => "Align to a power of two",
    ".EQU" => "Symbolic constant",
    ".SET" => "Symbolic constant",
    ".INCLUDE" => "Insert the contents of a source file",
    ".MACRO" => "Start of a macro definition",
    ".ENDM" => "End of a macro definition",
    ".TYPE" => "Symbol type",
    ".SIZE" => "Symbol size",
    ".COMM" => "Common symbol",
    ".LCOMM" => "Local common symbol",
    ".ZERO" => "Emit zero bytes",
    ".SKIP" => "Reserve bytes",
    ".FILL" => "Emit repeated values",
    ".REPT" => "Repeat block",
    ".ENDR" => "End of a repeat block",
    ".IF" => "Conditional assembly",
    ".ELSE" => "Conditional assembly alternative",
    ".ENDIF" => "End of conditional assembly",
    ".CODE16" => "16-bit code",
    ".CODE32" => "32-bit code",
    ".CODE64" => "64-bit code",
    ".INTEL_SYNTAX" => "Switch to Intel syntax",
    ".ATT_SYNTAX" => "Switch to AT&T syntax",
};

const SIZE_KEYWORDS: &[Keyword] = keywords! { Size:
    "BYTE" => "8-bit memory operand",
    "SBYTE" => "Signed 8-bit memory operand",
    "WORD" => "16-bit memory operand",
    "SWORD" => "Signed 16-bit memory operand",
    "DWORD" => "32-bit memory operand",
    "SDWORD" => "Signed 32-bit memory operand",
    "FWORD" => "48-bit memory operand",
    "QWORD" => "64-bit memory operand",
    "TBYTE" => "80-bit memory operand",
    "TWORD" => "80-bit memory operand",
    "REAL4" => "32-bit floating point memory operand",
    "REAL8" => "64-bit floating point memory operand",
    "REAL10" => "80-bit floating point memory operand",
    "MMWORD" => "64-bit MMX memory operand",
    "OWORD" => "128-bit memory operand",
    "XMMWORD" => "128-bit SSE memory operand",
    "YMMWORD" => "256-bit AVX memory operand",
    "ZMMWORD" => "512-bit AVX-512 memory operand",
};

const MISC_KEYWORDS: &[Keyword] = keywords! { Misc:
    "PTR" => "Memory operand type override",
    "OFFSET" => "Offset of a symbol",
    "SHORT" => "Short (8-bit displacement) jump",
    "NEAR" => "Near jump or call",
    "FAR" => "Far jump or call",
    "SEG" => "Segment of a symbol",
    "DUP" => "Duplicate a data initialiser",
    "REL" => "RIP-relative address",
    "ABS" => "Absolute address",
    "WRT" => "Offset relative to a segment",
    "SIZEOF" => "Size of a type or variable",
    "LENGTHOF" => "Number of elements of a variable",
    "TYPE" => "Type of an expression",
};

const PREFIXES: &[&str] = &["LOCK", "REP", "REPE", "REPZ", "REPNE", "REPNZ"];

/// Data definition directives that make the preceding identifier a label in
/// MASM (`buffer DB 16 DUP(0)`).
const MASM_DATA_DIRECTIVES: &[&str] = &[
    "DB", "DW", "DD", "DQ", "DT", "BYTE", "SBYTE", "WORD", "SWORD", "DWORD", "SDWORD", "FWORD",
    "QWORD", "TBYTE", "REAL4", "REAL8", "REAL10", "OWORD", "XMMWORD", "YMMWORD",
];

pub fn directives(dialect: Dialect) -> &'static [Keyword] {
    match dialect {
        Dialect::Masm => MASM_DIRECTIVES,
        Dialect::NasmIntel => NASM_DIRECTIVES,
        Dialect::NasmAtt => GAS_DIRECTIVES,
    }
}

pub fn size_keywords() -> &'static [Keyword] {
    SIZE_KEYWORDS
}

pub fn misc_keywords() -> &'static [Keyword] {
    MISC_KEYWORDS
}

/// Looks `word` up among the directives of `dialect`, then size and misc
/// keywords. Case-insensitive.
pub fn lookup(dialect: Dialect, word: &str) -> Option<&'static Keyword> {
    let upper = word.to_ascii_uppercase();
    directives(dialect)
        .iter()
        .chain(SIZE_KEYWORDS)
        .chain(MISC_KEYWORDS)
        .find(|keyword| keyword.name == upper)
}

pub fn is_directive(dialect: Dialect, word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    directives(dialect).iter().any(|keyword| keyword.name == upper)
}

pub fn is_prefix(word: &str) -> bool {
    PREFIXES.iter().any(|prefix| prefix.eq_ignore_ascii_case(word))
}

pub fn is_masm_data_directive(word: &str) -> bool {
    MASM_DATA_DIRECTIVES
        .iter()
        .any(|directive| directive.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_dialect_specific() {
        assert!(is_directive(Dialect::Masm, "proc"));
        assert!(!is_directive(Dialect::NasmIntel, "proc"));
        assert!(is_directive(Dialect::NasmIntel, "%include"));
        assert!(is_directive(Dialect::NasmAtt, ".globl"));
        assert!(!is_directive(Dialect::Masm, ".globl"));
    }

    #[test]
    fn size_and_misc_keywords_are_shared() {
        let keyword = lookup(Dialect::NasmAtt, "qword").expect("size keyword");
        assert_eq!(keyword.kind, KeywordKind::Size);
        let keyword = lookup(Dialect::Masm, "ptr").expect("misc keyword");
        assert_eq!(keyword.kind, KeywordKind::Misc);
        assert!(lookup(Dialect::Masm, "mov").is_none());
    }

    #[test]
    fn prefixes_and_data_directives() {
        assert!(is_prefix("rep"));
        assert!(is_prefix("LOCK"));
        assert!(!is_prefix("MOV"));
        assert!(is_masm_data_directive("dd"));
        assert!(is_masm_data_directive("Dword"));
        assert!(!is_masm_data_directive("PROC"));
    }
}
