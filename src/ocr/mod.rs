//! Remote OCR for documents that are not plain text
//!
//! Documents are submitted to the read model; the service either answers
//! inline or returns an `operation-location` that is polled until the job
//! succeeds, fails, or the attempt budget runs out.

pub mod client;
pub mod flatten;
pub mod transport;

pub use client::{JobHandle, JobOutcome, OcrClient, OcrDocument, Submission, READ_MODEL_PATH};
pub use flatten::flatten_read_result;
pub use transport::{HttpTransport, OcrTransport, TransportResponse};
