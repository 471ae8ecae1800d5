//! Media resolution pipeline: link detection, redirect resolution, extraction
//! strategies, bounded downloads, kind classification and delivery with
//! guaranteed temp-file cleanup.

pub mod asset;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod http;
pub mod kind;
pub mod links;
pub mod pipeline;
pub mod resolve;
pub mod strategy;

pub use {
    asset::{FetchedAsset, TempRoot},
    dispatch::{MediaSink, deliver},
    error::{Error, Result},
    fetch::AssetFetcher,
    http::build_client,
    kind::{MediaKind, classify},
    links::{LinkCandidate, LinkClassifier},
    pipeline::{LinkFailure, LinkOutcome, LinkReport, Pipeline, Stage},
    strategy::{
        Extraction, MediaHint, MediaReference, MediaSource, ResolvedResource, Strategy,
        build_strategies,
    },
};
