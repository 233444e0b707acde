//! Pipeline stages from document to typed analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network-facing ones can be swapped for in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! transcript ─┐
//! (FMP GET)   ├──▶ RawText ──▶ llm ──▶ normalize ──▶ TariffAnalysis
//! pdf_text ───┘              (POST)   (shape fix)
//! (pdfium)
//! ```
//!
//! 1. [`input`]     : source descriptors, [`input::RawText`], small parsers
//! 2. [`transcript`]: remote earnings-call transcript fetch with a TTL cache
//! 3. [`pdf_text`]  : page text from uploaded PDFs; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`llm`]       : the extraction call; the only stage that talks to a model
//! 5. [`normalize`] : fold the model's loosely-shaped JSON into typed records

pub mod input;
pub mod llm;
pub mod normalize;
pub mod pdf_text;
pub mod transcript;
