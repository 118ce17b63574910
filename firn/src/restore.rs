//! Resuming a checkpointed process.

use {
    crate::{Configuration, Environment, Error, RestoreStage, RuntimeState},
    std::num::NonZeroUsize,
};

impl Configuration
{
    /// Reinitialize the memory subsystem after a checkpointed process resumes.
    ///
    /// The machine may have more processors than the one the checkpoint
    /// was taken on, so the tuning is derived again.
    /// The GC thread count never drops below the number of threads
    /// the dispatcher has already started.
    /// Every live environment is then reinitialized;
    /// the first failure aborts the restore.
    pub fn reinitialize_for_restore<'e, I>(
        &mut self,
        state: &mut RuntimeState,
        environments: I,
    ) -> Result<(), Error>
        where I: IntoIterator<Item = &'e mut Environment>
    {
        self.initialize_gc_thread_count(state);

        let started = state.dispatcher.as_ref()
            .and_then(|dispatcher| NonZeroUsize::new(dispatcher.thread_count_maximum()));
        if let Some(started) = started {
            if started > state.gc_thread_count {
                log::debug!(
                    target: "gc",
                    "Raising GC thread count from {} to the {started} threads already started",
                    state.gc_thread_count,
                );
                state.gc_thread_count = started;
            }
        }

        self.initialize_gc_parameters(state);

        self.delegate.reinitialize_for_restore(state)
            .map_err(|source| {
                log::warn!(target: "gc", "Delegate cannot restore: {source}");
                Error::RestoreAborted{stage: RestoreStage::Delegate, source}
            })?;

        for environment in environments {
            let thread = environment.thread();
            environment.reinitialize_for_restore()
                .map_err(|source| {
                    log::warn!(target: "gc", "Thread {thread} cannot restore: {source}");
                    Error::RestoreAborted{stage: RestoreStage::Thread(thread), source}
                })?;
        }

        Ok(())
    }
}
