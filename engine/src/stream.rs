//! The HTML body of a streaming response as a [`Stream`].

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use futures_util::future::LocalBoxFuture;
use tokio::sync::mpsc;

use strand_types::Chunk;

use crate::errors::RenderError;
use crate::wire::ChunkEncoder;

/// Yields the initial HTML, then one script per chunk in settlement order.
///
/// Ends once resolution has finished and every chunk produced before that
/// point has been yielded. A structural render error is yielded once, after
/// the chunks queued ahead of it, and ends the stream.
pub struct HtmlStream {
    initial: Option<String>,
    chunks: mpsc::UnboundedReceiver<Chunk>,
    done: Option<LocalBoxFuture<'static, Result<(), RenderError>>>,
    failed: Option<RenderError>,
    encoder: ChunkEncoder,
}

impl HtmlStream {
    pub(crate) fn new(
        initial: String,
        chunks: mpsc::UnboundedReceiver<Chunk>,
        done: LocalBoxFuture<'static, Result<(), RenderError>>,
        encoder: ChunkEncoder,
    ) -> Self {
        Self {
            initial: Some(initial),
            chunks,
            done: Some(done),
            failed: None,
            encoder,
        }
    }
}

impl Stream for HtmlStream {
    type Item = Result<String, RenderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(initial) = this.initial.take() {
            return Poll::Ready(Some(Ok(initial)));
        }

        loop {
            // Chunks are sent before the resolver moves on, so everything a
            // finished render produced is already queued here.
            if let Poll::Ready(Some(chunk)) = this.chunks.poll_recv(cx) {
                return Poll::Ready(Some(this.encoder.encode(&chunk)));
            }

            let Some(done) = this.done.as_mut() else {
                return match this.failed.take() {
                    Some(err) => {
                        // Nothing sent after the failure is yielded.
                        this.chunks.close();
                        Poll::Ready(Some(Err(err)))
                    }
                    None => Poll::Ready(None),
                };
            };
            match done.as_mut().poll(cx) {
                Poll::Ready(result) => {
                    this.done = None;
                    this.failed = result.err();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
