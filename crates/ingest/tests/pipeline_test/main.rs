//! Pipeline tests with scripted in-process fakes for the message source, the
//! LLM provider, the geocoder and the record store.

mod consumer;
mod helpers;
mod supervisor;
