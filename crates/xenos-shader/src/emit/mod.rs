//! Source emission: turns decoded instructions into portable shader source
//! text via an [`buffer::EmitBuffer`] (`§4.4`).

pub mod alu;
pub mod buffer;
pub mod prologue;
pub mod structurer;
pub mod texture_fetch;
pub mod vertex_fetch;

pub use alu::AluEmitContext;
pub use buffer::EmitBuffer;
