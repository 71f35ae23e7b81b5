//! Awaiting promises from async code.
//!
//! `promise.await` resolves to `Result<T, E>`. Awaiting does not drive the
//! task queue: the waker fires from a queued task once the promise settles,
//! so whatever polls the future must also drain the queue.

use std::cell::RefCell;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::promise::{Promise, Reaction};
use crate::types::Snapshot;

/// Future returned by `Promise::into_future`.
#[must_use = "futures do nothing unless polled"]
pub struct Settled<T, E> {
    promise: Promise<T, E>,
    waker: Option<Rc<RefCell<Waker>>>,
}

impl<T, E> IntoFuture for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Settled {
            promise: self,
            waker: None,
        }
    }
}

impl<T, E> Future for Settled<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.promise.inspect() {
            Snapshot::Fulfilled(value) => return Poll::Ready(Ok(value)),
            Snapshot::Rejected(reason) => return Poll::Ready(Err(reason)),
            Snapshot::Pending => {}
        }

        let current = cx.waker();
        if let Some(slot) = &this.waker {
            let mut registered = slot.borrow_mut();
            if !registered.will_wake(current) {
                registered.clone_from(current);
            }
        } else {
            let slot = Rc::new(RefCell::new(current.clone()));
            let wake = Rc::clone(&slot);
            this.promise
                .subscribe(Reaction::settled(move |_| wake.borrow().wake_by_ref()));
            this.waker = Some(slot);
        }
        Poll::Pending
    }
}
