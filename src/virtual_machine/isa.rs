//! Opcode set of the stack machine.
//!
//! [`for_each_opcode!`](crate::for_each_opcode) holds the canonical opcode
//! list and hands it to a callback macro. This module uses it to build the
//! [`OpCode`] enum; [`ops`](super::ops) uses the same list to build the
//! dispatch table, so the two can never disagree.
//!
//! Each entry reads `Name = byte, "MNEMONIC" => operand layout, family::handler`.
//!
//! # Bytecode Format
//!
//! One opcode byte followed by the inline operand described by its
//! [`Operand`]. Multi-byte integers are little-endian and jump offsets are
//! relative to the opcode's own position.

use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::operand::Operand;
use std::fmt;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Constants
            // =========================
            /// PUSH0 ; pushes an empty byte array
            Push0 = 0x00, "PUSH0" => Operand::None, push::push0,
            PushBytes1 = 0x01, "PUSHBYTES1" => Operand::Fixed(1), push::push_bytes,
            PushBytes2 = 0x02, "PUSHBYTES2" => Operand::Fixed(2), push::push_bytes,
            PushBytes3 = 0x03, "PUSHBYTES3" => Operand::Fixed(3), push::push_bytes,
            PushBytes4 = 0x04, "PUSHBYTES4" => Operand::Fixed(4), push::push_bytes,
            PushBytes5 = 0x05, "PUSHBYTES5" => Operand::Fixed(5), push::push_bytes,
            PushBytes6 = 0x06, "PUSHBYTES6" => Operand::Fixed(6), push::push_bytes,
            PushBytes7 = 0x07, "PUSHBYTES7" => Operand::Fixed(7), push::push_bytes,
            PushBytes8 = 0x08, "PUSHBYTES8" => Operand::Fixed(8), push::push_bytes,
            PushBytes9 = 0x09, "PUSHBYTES9" => Operand::Fixed(9), push::push_bytes,
            PushBytes10 = 0x0A, "PUSHBYTES10" => Operand::Fixed(10), push::push_bytes,
            PushBytes11 = 0x0B, "PUSHBYTES11" => Operand::Fixed(11), push::push_bytes,
            PushBytes12 = 0x0C, "PUSHBYTES12" => Operand::Fixed(12), push::push_bytes,
            PushBytes13 = 0x0D, "PUSHBYTES13" => Operand::Fixed(13), push::push_bytes,
            PushBytes14 = 0x0E, "PUSHBYTES14" => Operand::Fixed(14), push::push_bytes,
            PushBytes15 = 0x0F, "PUSHBYTES15" => Operand::Fixed(15), push::push_bytes,
            PushBytes16 = 0x10, "PUSHBYTES16" => Operand::Fixed(16), push::push_bytes,
            PushBytes17 = 0x11, "PUSHBYTES17" => Operand::Fixed(17), push::push_bytes,
            PushBytes18 = 0x12, "PUSHBYTES18" => Operand::Fixed(18), push::push_bytes,
            PushBytes19 = 0x13, "PUSHBYTES19" => Operand::Fixed(19), push::push_bytes,
            PushBytes20 = 0x14, "PUSHBYTES20" => Operand::Fixed(20), push::push_bytes,
            PushBytes21 = 0x15, "PUSHBYTES21" => Operand::Fixed(21), push::push_bytes,
            PushBytes22 = 0x16, "PUSHBYTES22" => Operand::Fixed(22), push::push_bytes,
            PushBytes23 = 0x17, "PUSHBYTES23" => Operand::Fixed(23), push::push_bytes,
            PushBytes24 = 0x18, "PUSHBYTES24" => Operand::Fixed(24), push::push_bytes,
            PushBytes25 = 0x19, "PUSHBYTES25" => Operand::Fixed(25), push::push_bytes,
            PushBytes26 = 0x1A, "PUSHBYTES26" => Operand::Fixed(26), push::push_bytes,
            PushBytes27 = 0x1B, "PUSHBYTES27" => Operand::Fixed(27), push::push_bytes,
            PushBytes28 = 0x1C, "PUSHBYTES28" => Operand::Fixed(28), push::push_bytes,
            PushBytes29 = 0x1D, "PUSHBYTES29" => Operand::Fixed(29), push::push_bytes,
            PushBytes30 = 0x1E, "PUSHBYTES30" => Operand::Fixed(30), push::push_bytes,
            PushBytes31 = 0x1F, "PUSHBYTES31" => Operand::Fixed(31), push::push_bytes,
            PushBytes32 = 0x20, "PUSHBYTES32" => Operand::Fixed(32), push::push_bytes,
            PushBytes33 = 0x21, "PUSHBYTES33" => Operand::Fixed(33), push::push_bytes,
            PushBytes34 = 0x22, "PUSHBYTES34" => Operand::Fixed(34), push::push_bytes,
            PushBytes35 = 0x23, "PUSHBYTES35" => Operand::Fixed(35), push::push_bytes,
            PushBytes36 = 0x24, "PUSHBYTES36" => Operand::Fixed(36), push::push_bytes,
            PushBytes37 = 0x25, "PUSHBYTES37" => Operand::Fixed(37), push::push_bytes,
            PushBytes38 = 0x26, "PUSHBYTES38" => Operand::Fixed(38), push::push_bytes,
            PushBytes39 = 0x27, "PUSHBYTES39" => Operand::Fixed(39), push::push_bytes,
            PushBytes40 = 0x28, "PUSHBYTES40" => Operand::Fixed(40), push::push_bytes,
            PushBytes41 = 0x29, "PUSHBYTES41" => Operand::Fixed(41), push::push_bytes,
            PushBytes42 = 0x2A, "PUSHBYTES42" => Operand::Fixed(42), push::push_bytes,
            PushBytes43 = 0x2B, "PUSHBYTES43" => Operand::Fixed(43), push::push_bytes,
            PushBytes44 = 0x2C, "PUSHBYTES44" => Operand::Fixed(44), push::push_bytes,
            PushBytes45 = 0x2D, "PUSHBYTES45" => Operand::Fixed(45), push::push_bytes,
            PushBytes46 = 0x2E, "PUSHBYTES46" => Operand::Fixed(46), push::push_bytes,
            PushBytes47 = 0x2F, "PUSHBYTES47" => Operand::Fixed(47), push::push_bytes,
            PushBytes48 = 0x30, "PUSHBYTES48" => Operand::Fixed(48), push::push_bytes,
            PushBytes49 = 0x31, "PUSHBYTES49" => Operand::Fixed(49), push::push_bytes,
            PushBytes50 = 0x32, "PUSHBYTES50" => Operand::Fixed(50), push::push_bytes,
            PushBytes51 = 0x33, "PUSHBYTES51" => Operand::Fixed(51), push::push_bytes,
            PushBytes52 = 0x34, "PUSHBYTES52" => Operand::Fixed(52), push::push_bytes,
            PushBytes53 = 0x35, "PUSHBYTES53" => Operand::Fixed(53), push::push_bytes,
            PushBytes54 = 0x36, "PUSHBYTES54" => Operand::Fixed(54), push::push_bytes,
            PushBytes55 = 0x37, "PUSHBYTES55" => Operand::Fixed(55), push::push_bytes,
            PushBytes56 = 0x38, "PUSHBYTES56" => Operand::Fixed(56), push::push_bytes,
            PushBytes57 = 0x39, "PUSHBYTES57" => Operand::Fixed(57), push::push_bytes,
            PushBytes58 = 0x3A, "PUSHBYTES58" => Operand::Fixed(58), push::push_bytes,
            PushBytes59 = 0x3B, "PUSHBYTES59" => Operand::Fixed(59), push::push_bytes,
            PushBytes60 = 0x3C, "PUSHBYTES60" => Operand::Fixed(60), push::push_bytes,
            PushBytes61 = 0x3D, "PUSHBYTES61" => Operand::Fixed(61), push::push_bytes,
            PushBytes62 = 0x3E, "PUSHBYTES62" => Operand::Fixed(62), push::push_bytes,
            PushBytes63 = 0x3F, "PUSHBYTES63" => Operand::Fixed(63), push::push_bytes,
            PushBytes64 = 0x40, "PUSHBYTES64" => Operand::Fixed(64), push::push_bytes,
            PushBytes65 = 0x41, "PUSHBYTES65" => Operand::Fixed(65), push::push_bytes,
            PushBytes66 = 0x42, "PUSHBYTES66" => Operand::Fixed(66), push::push_bytes,
            PushBytes67 = 0x43, "PUSHBYTES67" => Operand::Fixed(67), push::push_bytes,
            PushBytes68 = 0x44, "PUSHBYTES68" => Operand::Fixed(68), push::push_bytes,
            PushBytes69 = 0x45, "PUSHBYTES69" => Operand::Fixed(69), push::push_bytes,
            PushBytes70 = 0x46, "PUSHBYTES70" => Operand::Fixed(70), push::push_bytes,
            PushBytes71 = 0x47, "PUSHBYTES71" => Operand::Fixed(71), push::push_bytes,
            PushBytes72 = 0x48, "PUSHBYTES72" => Operand::Fixed(72), push::push_bytes,
            PushBytes73 = 0x49, "PUSHBYTES73" => Operand::Fixed(73), push::push_bytes,
            PushBytes74 = 0x4A, "PUSHBYTES74" => Operand::Fixed(74), push::push_bytes,
            PushBytes75 = 0x4B, "PUSHBYTES75" => Operand::Fixed(75), push::push_bytes,
            /// PUSHDATA1 len:u8 data ; pushes `len` bytes
            PushData1 = 0x4C, "PUSHDATA1" => Operand::Prefixed(1), push::push_data,
            /// PUSHDATA2 len:u16 data ; pushes `len` bytes
            PushData2 = 0x4D, "PUSHDATA2" => Operand::Prefixed(2), push::push_data,
            /// PUSHDATA4 len:u32 data ; pushes `len` bytes
            PushData4 = 0x4E, "PUSHDATA4" => Operand::Prefixed(4), push::push_data,
            /// PUSHM1 ; pushes -1
            PushM1 = 0x4F, "PUSHM1" => Operand::None, push::push_small_int,
            Push1 = 0x51, "PUSH1" => Operand::None, push::push_small_int,
            Push2 = 0x52, "PUSH2" => Operand::None, push::push_small_int,
            Push3 = 0x53, "PUSH3" => Operand::None, push::push_small_int,
            Push4 = 0x54, "PUSH4" => Operand::None, push::push_small_int,
            Push5 = 0x55, "PUSH5" => Operand::None, push::push_small_int,
            Push6 = 0x56, "PUSH6" => Operand::None, push::push_small_int,
            Push7 = 0x57, "PUSH7" => Operand::None, push::push_small_int,
            Push8 = 0x58, "PUSH8" => Operand::None, push::push_small_int,
            Push9 = 0x59, "PUSH9" => Operand::None, push::push_small_int,
            Push10 = 0x5A, "PUSH10" => Operand::None, push::push_small_int,
            Push11 = 0x5B, "PUSH11" => Operand::None, push::push_small_int,
            Push12 = 0x5C, "PUSH12" => Operand::None, push::push_small_int,
            Push13 = 0x5D, "PUSH13" => Operand::None, push::push_small_int,
            Push14 = 0x5E, "PUSH14" => Operand::None, push::push_small_int,
            Push15 = 0x5F, "PUSH15" => Operand::None, push::push_small_int,
            Push16 = 0x60, "PUSH16" => Operand::None, push::push_small_int,
            // =========================
            // Flow control
            // =========================
            Nop = 0x61, "NOP" => Operand::None, flow::nop,
            /// JMP offset:i16 ; ip = position + offset
            Jmp = 0x62, "JMP" => Operand::Fixed(2), flow::jmp,
            /// JMPIF offset:i16 ; jumps if the popped item is true
            JmpIf = 0x63, "JMPIF" => Operand::Fixed(2), flow::jmp,
            /// JMPIFNOT offset:i16 ; jumps if the popped item is false
            JmpIfNot = 0x64, "JMPIFNOT" => Operand::Fixed(2), flow::jmp,
            /// CALL offset:i16 ; calls into the same script, moving the whole stack
            Call = 0x65, "CALL" => Operand::Fixed(2), flow::call,
            /// RET ; returns from the current frame
            Ret = 0x66, "RET" => Operand::None, flow::ret,
            /// APPCALL hash:[u8;20] ; calls another contract's script
            AppCall = 0x67, "APPCALL" => Operand::Fixed(20), flow::app_call,
            /// SYSCALL name:var-bytes ; invokes a registered interop
            Syscall = 0x68, "SYSCALL" => Operand::VarBytes { max: 252 }, flow::syscall,
            /// TAILCALL hash:[u8;20] ; like APPCALL, replacing the current frame
            TailCall = 0x69, "TAILCALL" => Operand::Fixed(20), flow::app_call,
            // =========================
            // Stack
            // =========================
            DupFromAltStack = 0x6A, "DUPFROMALTSTACK" => Operand::None, stack::dup_from_alt_stack,
            ToAltStack = 0x6B, "TOALTSTACK" => Operand::None, stack::to_alt_stack,
            FromAltStack = 0x6C, "FROMALTSTACK" => Operand::None, stack::from_alt_stack,
            XDrop = 0x6D, "XDROP" => Operand::None, stack::xdrop,
            XSwap = 0x72, "XSWAP" => Operand::None, stack::xswap,
            XTuck = 0x73, "XTUCK" => Operand::None, stack::xtuck,
            Depth = 0x74, "DEPTH" => Operand::None, stack::depth,
            Drop = 0x75, "DROP" => Operand::None, stack::drop,
            Dup = 0x76, "DUP" => Operand::None, stack::dup,
            Nip = 0x77, "NIP" => Operand::None, stack::nip,
            Over = 0x78, "OVER" => Operand::None, stack::over,
            Pick = 0x79, "PICK" => Operand::None, stack::pick,
            Roll = 0x7A, "ROLL" => Operand::None, stack::roll,
            Rot = 0x7B, "ROT" => Operand::None, stack::rot,
            Swap = 0x7C, "SWAP" => Operand::None, stack::swap,
            Tuck = 0x7D, "TUCK" => Operand::None, stack::tuck,
            // =========================
            // Splice
            // =========================
            Cat = 0x7E, "CAT" => Operand::None, splice::cat,
            SubStr = 0x7F, "SUBSTR" => Operand::None, splice::substr,
            Left = 0x80, "LEFT" => Operand::None, splice::left,
            Right = 0x81, "RIGHT" => Operand::None, splice::right,
            Size = 0x82, "SIZE" => Operand::None, splice::size,
            // =========================
            // Bitwise logic
            // =========================
            Invert = 0x83, "INVERT" => Operand::None, bitwise::invert,
            And = 0x84, "AND" => Operand::None, bitwise::and,
            Or = 0x85, "OR" => Operand::None, bitwise::or,
            Xor = 0x86, "XOR" => Operand::None, bitwise::xor,
            Equal = 0x87, "EQUAL" => Operand::None, bitwise::equal,
            // =========================
            // Arithmetic
            // =========================
            Inc = 0x8B, "INC" => Operand::None, arithmetic::inc,
            Dec = 0x8C, "DEC" => Operand::None, arithmetic::dec,
            Sign = 0x8D, "SIGN" => Operand::None, arithmetic::sign,
            Negate = 0x8F, "NEGATE" => Operand::None, arithmetic::negate,
            Abs = 0x90, "ABS" => Operand::None, arithmetic::abs,
            Not = 0x91, "NOT" => Operand::None, arithmetic::not,
            Nz = 0x92, "NZ" => Operand::None, arithmetic::nz,
            Add = 0x93, "ADD" => Operand::None, arithmetic::add,
            Sub = 0x94, "SUB" => Operand::None, arithmetic::sub,
            Mul = 0x95, "MUL" => Operand::None, arithmetic::mul,
            Div = 0x96, "DIV" => Operand::None, arithmetic::div,
            Mod = 0x97, "MOD" => Operand::None, arithmetic::modulo,
            Shl = 0x98, "SHL" => Operand::None, arithmetic::shl,
            Shr = 0x99, "SHR" => Operand::None, arithmetic::shr,
            BoolAnd = 0x9A, "BOOLAND" => Operand::None, arithmetic::bool_and,
            BoolOr = 0x9B, "BOOLOR" => Operand::None, arithmetic::bool_or,
            NumEqual = 0x9C, "NUMEQUAL" => Operand::None, arithmetic::num_equal,
            NumNotEqual = 0x9E, "NUMNOTEQUAL" => Operand::None, arithmetic::num_not_equal,
            Lt = 0x9F, "LT" => Operand::None, arithmetic::lt,
            Gt = 0xA0, "GT" => Operand::None, arithmetic::gt,
            Lte = 0xA1, "LTE" => Operand::None, arithmetic::lte,
            Gte = 0xA2, "GTE" => Operand::None, arithmetic::gte,
            Min = 0xA3, "MIN" => Operand::None, arithmetic::min,
            Max = 0xA4, "MAX" => Operand::None, arithmetic::max,
            /// WITHIN ; x a b -> a <= x < b
            Within = 0xA5, "WITHIN" => Operand::None, arithmetic::within,
            // =========================
            // Crypto
            // =========================
            Sha256 = 0xA8, "SHA256" => Operand::None, crypto::sha256,
            Hash160 = 0xA9, "HASH160" => Operand::None, crypto::hash160,
            Hash256 = 0xAA, "HASH256" => Operand::None, crypto::hash256,
            /// CHECKSIG ; signature pubkey -> bool over the container message
            CheckSig = 0xAC, "CHECKSIG" => Operand::None, crypto::check_sig,
            /// VERIFY ; message signature pubkey -> bool
            Verify = 0xAD, "VERIFY" => Operand::None, crypto::verify,
            CheckMultiSig = 0xAE, "CHECKMULTISIG" => Operand::None, crypto::check_multisig,
            // =========================
            // Arrays, structs and maps
            // =========================
            ArraySize = 0xC0, "ARRAYSIZE" => Operand::None, array::array_size,
            Pack = 0xC1, "PACK" => Operand::None, array::pack,
            Unpack = 0xC2, "UNPACK" => Operand::None, array::unpack,
            PickItem = 0xC3, "PICKITEM" => Operand::None, array::pick_item,
            SetItem = 0xC4, "SETITEM" => Operand::None, array::set_item,
            NewArray = 0xC5, "NEWARRAY" => Operand::None, array::new_array,
            NewStruct = 0xC6, "NEWSTRUCT" => Operand::None, array::new_struct,
            NewMap = 0xC7, "NEWMAP" => Operand::None, array::new_map,
            Append = 0xC8, "APPEND" => Operand::None, array::append,
            Reverse = 0xC9, "REVERSE" => Operand::None, array::reverse,
            Remove = 0xCA, "REMOVE" => Operand::None, array::remove,
            HasKey = 0xCB, "HASKEY" => Operand::None, array::has_key,
            Keys = 0xCC, "KEYS" => Operand::None, array::keys,
            Values = 0xCD, "VALUES" => Operand::None, array::values,
            // =========================
            // Stack isolation
            // =========================
            /// CALL_I rvcount:u8 pcount:u8 offset:i16 ; call moving `pcount` items
            CallI = 0xE0, "CALL_I" => Operand::Fixed(4), flow::call_i,
            // =========================
            // Exceptions
            // =========================
            Throw = 0xF0, "THROW" => Operand::None, exceptions::throw,
            /// THROWIFNOT ; faults unless the popped item is true
            ThrowIfNot = 0xF1, "THROWIFNOT" => Operand::None, exceptions::throw_if_not,
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal => $operand:expr, $family:ident :: $handler:ident
        ),* $(,)?
    ) => {
        /// A single opcode byte.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum OpCode {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl TryFrom<u8> for OpCode {
            type Error = VmError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $code => Ok(OpCode::$name), )*
                    _ => Err(VmError::InvalidOpcode(value)),
                }
            }
        }

        impl OpCode {
            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( OpCode::$name => $mnemonic, )*
                }
            }

            /// Layout of the inline operand following the opcode byte.
            pub const fn operand(&self) -> Operand {
                match self {
                    $( OpCode::$name => $operand, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
