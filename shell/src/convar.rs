//! Console variables: live read/write access to host application memory.
//!
//! The host registers a cell (1, 2 or 4 bytes: signed, unsigned or float —
//! or an array of such cells) with `convar_add!` / `convar_add_array!`; the
//! `var` command can then display and change it while the application runs.
//! Accesses are raw volatile loads/stores: the shell and the application
//! explicitly do not synchronize, mirroring how an operator pokes at a
//! running system.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::sync::atomic::AtomicU32;

use espshell_lib::numparse;
use espshell_lib::prefix_match;
use espshell_term::cprintf;
use espshell_term::editor::QM_BYPASS;

use crate::env::Env;
use crate::error::{CmdError, CmdResult};
use crate::input::ArgView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Signed,
    Unsigned,
    Float,
}

/// One registered variable.
#[derive(Clone, Copy)]
pub struct Convar {
    pub name: &'static str,
    addr: usize,
    size: u32,
    kind: CellKind,
    /// Arrays: elements addressable as `NAME[IDX]`; the variable itself is
    /// the registry's pointer kind and lists as an address.
    is_array: bool,
    elem_count: u32,
}

// SAFETY: the registrant guarantees the cell outlives the shell and accepts
// unsynchronized access (see module docs).
unsafe impl Send for Convar {}
unsafe impl Sync for Convar {}

/// A concrete addressable cell: either a scalar variable or one array
/// element.
pub struct Cell {
    pub display_name: String,
    addr: usize,
    size: u32,
    kind: CellKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellValue {
    Signed(i32),
    Unsigned(u32),
    Float(f32),
}

impl Cell {
    pub fn read(&self) -> CellValue {
        // SAFETY: addr/size were supplied at registration under the
        // registrant's liveness guarantee.
        unsafe {
            match (self.kind, self.size) {
                (CellKind::Float, _) => CellValue::Float((self.addr as *const f32).read_volatile()),
                (CellKind::Signed, 1) => {
                    CellValue::Signed((self.addr as *const i8).read_volatile() as i32)
                }
                (CellKind::Signed, 2) => {
                    CellValue::Signed((self.addr as *const i16).read_volatile() as i32)
                }
                (CellKind::Signed, _) => {
                    CellValue::Signed((self.addr as *const i32).read_volatile())
                }
                (CellKind::Unsigned, 1) => {
                    CellValue::Unsigned((self.addr as *const u8).read_volatile() as u32)
                }
                (CellKind::Unsigned, 2) => {
                    CellValue::Unsigned((self.addr as *const u16).read_volatile() as u32)
                }
                (CellKind::Unsigned, _) => {
                    CellValue::Unsigned((self.addr as *const u32).read_volatile())
                }
            }
        }
    }

    /// Parse `text` per the cell's kind and store it. Unsigned cells reject
    /// negatives, floats require a decimal point, integers must fit the
    /// cell width.
    pub fn write(&self, text: &str) -> Result<(), String> {
        match self.kind {
            CellKind::Float => {
                let v = numparse::parse_f32(text)
                    .ok_or_else(|| String::from("float value (with a decimal point) expected"))?;
                // SAFETY: see read().
                unsafe { (self.addr as *mut f32).write_volatile(v) };
                Ok(())
            }
            CellKind::Unsigned => {
                if text.starts_with('-') {
                    return Err(String::from("variable is unsigned, negative value rejected"));
                }
                let v = numparse::parse_u32(text)
                    .ok_or_else(|| String::from("numeric value expected"))?;
                let max = match self.size {
                    1 => u8::MAX as u32,
                    2 => u16::MAX as u32,
                    _ => u32::MAX,
                };
                if v > max {
                    return Err(alloc::format!("value does not fit into {} byte(s)", self.size));
                }
                // SAFETY: see read().
                unsafe {
                    match self.size {
                        1 => (self.addr as *mut u8).write_volatile(v as u8),
                        2 => (self.addr as *mut u16).write_volatile(v as u16),
                        _ => (self.addr as *mut u32).write_volatile(v),
                    }
                }
                Ok(())
            }
            CellKind::Signed => {
                let v = numparse::parse_i32(text)
                    .ok_or_else(|| String::from("numeric value expected"))?;
                let (min, max) = match self.size {
                    1 => (i8::MIN as i32, i8::MAX as i32),
                    2 => (i16::MIN as i32, i16::MAX as i32),
                    _ => (i32::MIN, i32::MAX),
                };
                if v < min || v > max {
                    return Err(alloc::format!("value does not fit into {} byte(s)", self.size));
                }
                // SAFETY: see read().
                unsafe {
                    match self.size {
                        1 => (self.addr as *mut i8).write_volatile(v as i8),
                        2 => (self.addr as *mut i16).write_volatile(v as i16),
                        _ => (self.addr as *mut i32).write_volatile(v),
                    }
                }
                Ok(())
            }
        }
    }

    pub fn value_string(&self) -> String {
        match self.read() {
            CellValue::Signed(v) => v.to_string(),
            CellValue::Unsigned(v) => v.to_string(),
            CellValue::Float(v) => alloc::format!("{v}"),
        }
    }
}

pub struct ConvarRegistry {
    vars: spin::Mutex<Vec<Convar>>,
}

impl ConvarRegistry {
    pub fn new() -> Self {
        Self {
            vars: spin::Mutex::new(Vec::new()),
        }
    }

    /// Register a scalar cell.
    ///
    /// # Safety
    /// `addr` must point to a live cell of `size` bytes that outlives the
    /// shell; the registrant accepts unsynchronized access.
    pub unsafe fn add_scalar(&self, name: &'static str, addr: usize, size: u32, kind: CellKind) {
        debug_assert!(matches!(size, 1 | 2 | 4));
        self.vars.lock().push(Convar {
            name,
            addr,
            size,
            kind,
            is_array: false,
            elem_count: 1,
        });
    }

    /// Register an array of scalar cells.
    ///
    /// # Safety
    /// Same contract as [`ConvarRegistry::add_scalar`], for
    /// `elem_size * count` bytes.
    pub unsafe fn add_array(
        &self,
        name: &'static str,
        addr: usize,
        elem_size: u32,
        count: u32,
        kind: CellKind,
    ) {
        debug_assert!(matches!(elem_size, 1 | 2 | 4));
        self.vars.lock().push(Convar {
            name,
            addr,
            size: elem_size,
            kind,
            is_array: true,
            elem_count: count,
        });
    }

    /// Built-in shell knobs exposed as variables.
    pub fn register_builtin(&self) {
        // SAFETY: QM_BYPASS is a static AtomicU32; plain volatile access to
        // it from the `var` command is acceptable by design.
        unsafe {
            self.add_scalar(
                "bypass_qm",
                &QM_BYPASS as *const AtomicU32 as usize,
                4,
                CellKind::Unsigned,
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.lock().is_empty()
    }

    fn entries(&self) -> Vec<Convar> {
        self.vars.lock().clone()
    }

    fn find(&self, env: &Env, name: &str) -> Option<Convar> {
        let vars = self.vars.lock();
        // Exact match first.
        if let Some(v) = vars.iter().find(|v| v.name == name) {
            return Some(*v);
        }
        // A single prefix candidate is accepted; two are an error.
        let mut candidate: Option<Convar> = None;
        for v in vars.iter() {
            if prefix_match(name, v.name) {
                if let Some(prev) = candidate {
                    cprintf!(
                        env.sh.con,
                        "% <e>Ambiguity: by \"{}\" did you mean \"{}\" or \"{}\"?</>\r\n",
                        name,
                        prev.name,
                        v.name
                    );
                    return None;
                }
                candidate = Some(*v);
            }
        }
        candidate
    }

    /// Resolve `NAME` or `NAME[IDX]` to a concrete cell.
    pub fn resolve(&self, env: &Env, name: &str) -> Option<Cell> {
        if let Some(bracket) = name.find('[') {
            let base = &name[..bracket];
            let rest = &name[bracket + 1..];
            let Some(close) = rest.find(']') else {
                env.sh
                    .con
                    .print("% <e>Closing bracket \"]\" expected</>\r\n");
                return None;
            };
            let Some(idx) = numparse::parse_u32(&rest[..close]) else {
                env.sh
                    .con
                    .print("% <e>Numeric index is expected inside []</>\r\n");
                return None;
            };
            let var = self.find(env, base)?;
            if !var.is_array {
                cprintf!(
                    env.sh.con,
                    "% Variable \"{}\" is neither a pointer nor an array\r\n",
                    base
                );
                return None;
            }
            if idx >= var.elem_count {
                cprintf!(
                    env.sh.con,
                    "% Requested element {} is beyond the array range 0..{}\r\n",
                    idx,
                    var.elem_count - 1
                );
                return None;
            }
            return Some(Cell {
                display_name: alloc::format!("{}[{}]", var.name, idx),
                addr: var.addr + (idx * var.size) as usize,
                size: var.size,
                kind: var.kind,
            });
        }

        let var = self.find(env, name)?;
        if var.is_array {
            // Whole-array display handled by the caller; expose element 0.
            return Some(Cell {
                display_name: String::from(var.name),
                addr: var.addr,
                size: var.size,
                kind: var.kind,
            });
        }
        Some(Cell {
            display_name: String::from(var.name),
            addr: var.addr,
            size: var.size,
            kind: var.kind,
        })
    }

    fn find_array(&self, env: &Env, name: &str) -> Option<Convar> {
        self.find(env, name).filter(|v| v.is_array)
    }
}

impl Default for ConvarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a scalar static: `convar_add!(registry, VAR: u32)`.
#[macro_export]
macro_rules! convar_add {
    ($reg:expr, $var:path : u8) => { $crate::convar_add!(@reg $reg, $var, 1, Unsigned) };
    ($reg:expr, $var:path : u16) => { $crate::convar_add!(@reg $reg, $var, 2, Unsigned) };
    ($reg:expr, $var:path : u32) => { $crate::convar_add!(@reg $reg, $var, 4, Unsigned) };
    ($reg:expr, $var:path : i8) => { $crate::convar_add!(@reg $reg, $var, 1, Signed) };
    ($reg:expr, $var:path : i16) => { $crate::convar_add!(@reg $reg, $var, 2, Signed) };
    ($reg:expr, $var:path : i32) => { $crate::convar_add!(@reg $reg, $var, 4, Signed) };
    ($reg:expr, $var:path : f32) => { $crate::convar_add!(@reg $reg, $var, 4, Float) };
    (@reg $reg:expr, $var:path, $size:expr, $kind:ident) => {
        // SAFETY: $var is a static; statics outlive the shell.
        unsafe {
            $reg.add_scalar(
                stringify!($var),
                ::core::ptr::addr_of!($var) as usize,
                $size,
                $crate::convar::CellKind::$kind,
            )
        }
    };
}

/// Register a static array: `convar_add_array!(registry, ARR: [u8; 16])`.
#[macro_export]
macro_rules! convar_add_array {
    ($reg:expr, $var:path : [u8; $n:expr]) => { $crate::convar_add_array!(@reg $reg, $var, 1, $n, Unsigned) };
    ($reg:expr, $var:path : [u16; $n:expr]) => { $crate::convar_add_array!(@reg $reg, $var, 2, $n, Unsigned) };
    ($reg:expr, $var:path : [u32; $n:expr]) => { $crate::convar_add_array!(@reg $reg, $var, 4, $n, Unsigned) };
    ($reg:expr, $var:path : [i32; $n:expr]) => { $crate::convar_add_array!(@reg $reg, $var, 4, $n, Signed) };
    ($reg:expr, $var:path : [f32; $n:expr]) => { $crate::convar_add_array!(@reg $reg, $var, 4, $n, Float) };
    (@reg $reg:expr, $var:path, $size:expr, $n:expr, $kind:ident) => {
        // SAFETY: $var is a static; statics outlive the shell.
        unsafe {
            $reg.add_array(
                stringify!($var),
                ::core::ptr::addr_of!($var) as usize,
                $size,
                $n,
                $crate::convar::CellKind::$kind,
            )
        }
    };
}

// ---------------------------------------------------------------------------
// The "var" command
// ---------------------------------------------------------------------------

fn kind_name(kind: CellKind, size: u32) -> &'static str {
    match (kind, size) {
        (CellKind::Float, _) => "float",
        (CellKind::Signed, 1) => "signed char",
        (CellKind::Signed, 2) => "signed short",
        (CellKind::Signed, _) => "signed int",
        (CellKind::Unsigned, 1) => "unsigned char",
        (CellKind::Unsigned, 2) => "unsigned short",
        (CellKind::Unsigned, _) => "unsigned int",
    }
}

fn ptr_kind_name(kind: CellKind, size: u32) -> &'static str {
    match (kind, size) {
        (CellKind::Float, _) => "float *",
        (CellKind::Signed, 1) => "signed char *",
        (CellKind::Signed, 2) => "signed short *",
        (CellKind::Signed, _) => "signed int *",
        (CellKind::Unsigned, 1) => "unsigned char *",
        (CellKind::Unsigned, 2) => "unsigned short *",
        (CellKind::Unsigned, _) => "unsigned int *",
    }
}

fn show_list(env: &Env) {
    if env.sh.convars.is_empty() {
        env.sh.con.print(
            "% <e>Oops :-(\r\n% No registered variables to play with</>\r\n\
             % Use the \"convar_add!\" macro to register your variables\r\n",
        );
        return;
    }
    env.sh.con.print(
        "% Registered variables:\r\n\
         %<r> Name              | Type            | Value          </>\r\n\
         % ------------------+-----------------+-----------------\r\n",
    );
    for var in env.sh.convars.entries() {
        if var.is_array {
            // Arrays and pointers display as addresses, not as *(address).
            cprintf!(
                env.sh.con,
                "% {:<17} | {:<15} | 0x{:x}\r\n",
                var.name,
                ptr_kind_name(var.kind, var.size),
                var.addr
            );
        } else {
            let cell = Cell {
                display_name: String::new(),
                addr: var.addr,
                size: var.size,
                kind: var.kind,
            };
            cprintf!(
                env.sh.con,
                "% {:<17} | {:<15} | {}\r\n",
                var.name,
                kind_name(var.kind, var.size),
                cell.value_string()
            );
        }
    }
}

fn show_array(env: &Env, var: Convar) {
    cprintf!(
        env.sh.con,
        "% {} is an array of {} x {}:\r\n",
        var.name,
        var.elem_count,
        kind_name(var.kind, var.size)
    );
    for idx in 0..var.elem_count {
        let cell = Cell {
            display_name: String::new(),
            addr: var.addr + (idx * var.size) as usize,
            size: var.size,
            kind: var.kind,
        };
        cprintf!(
            env.sh.con,
            "% {}[{}] = {}\r\n",
            var.name,
            idx,
            cell.value_string()
        );
    }
}

/// Display an arbitrary number in every base the shell accepts.
fn show_number(env: &Env, text: &str) -> CmdResult {
    if let Some(v) = numparse::parse_u32(text) {
        cprintf!(
            env.sh.con,
            "% {} == decimal {}, hex 0x{:x}, octal 0{:o}, binary 0b{:b}\r\n",
            text,
            v,
            v,
            v,
            v
        );
        if let Some(f) = numparse::parse_f32(text) {
            cprintf!(env.sh.con, "% As float: {}\r\n", f);
        }
        Ok(())
    } else if let Some(f) = numparse::parse_f32(text) {
        cprintf!(env.sh.con, "% {} == float {}\r\n", text, f);
        Ok(())
    } else {
        Err(CmdError::BadArg(1))
    }
}

// "var", "var NAME", "var NAME VALUE", "var NUMBER"
pub fn cmd_var(env: &mut Env, args: &ArgView<'_>) -> CmdResult {
    match args.argc() {
        1 => {
            show_list(env);
            Ok(())
        }
        2 => {
            let name = args.arg(1);
            if numparse::is_numeric(name) {
                return show_number(env, name);
            }
            // Whole-array display for registered arrays.
            if !name.contains('[') {
                if let Some(var) = env.sh.convars.find_array(env, name) {
                    show_array(env, var);
                    return Ok(());
                }
            }
            match env.sh.convars.resolve(env, name) {
                Some(cell) => {
                    cprintf!(
                        env.sh.con,
                        "% {} = <i>{}</>\r\n",
                        cell.display_name,
                        cell.value_string()
                    );
                    Ok(())
                }
                None => Err(CmdError::Failed),
            }
        }
        3 => {
            let name = args.arg(1);
            let value = args.arg(2);
            let Some(cell) = env.sh.convars.resolve(env, name) else {
                return Err(CmdError::Failed);
            };
            match cell.write(value) {
                Ok(()) => {
                    cprintf!(
                        env.sh.con,
                        "% {} = <i>{}</>\r\n",
                        cell.display_name,
                        cell.value_string()
                    );
                    Ok(())
                }
                Err(msg) => {
                    cprintf!(env.sh.con, "% <e>{}</>\r\n", msg);
                    Err(CmdError::Failed)
                }
            }
        }
        _ => Err(CmdError::MissingArg),
    }
}
