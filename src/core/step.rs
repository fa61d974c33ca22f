use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::item::{ItemProcessor, ItemReader, ItemWriter};

/// Lifecycle of a step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Starting,
    Started,
    Success,
    ReadError,
    ProcessorError,
    WriteError,
    TaskletError,
}

#[derive(Debug, PartialEq)]
enum ChunkStatus {
    /// The chunk reached `chunk_size` items, more may follow.
    Full,
    /// The reader is exhausted.
    Finished,
}

/// Counters and timings of one step run.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Name of the executed step
    pub name: String,
    /// Current status of the step execution
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items the processor dropped
    pub filter_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of errors encountered during reading
    pub read_error_count: usize,
    /// Number of errors encountered during processing
    pub process_error_count: usize,
    /// Number of errors encountered during writing
    pub write_error_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::default(),
            read_count: 0,
            filter_count: 0,
            write_count: 0,
            read_error_count: 0,
            process_error_count: 0,
            write_error_count: 0,
        }
    }

    fn finish(&mut self, start_time: Instant) {
        self.start_time = start_time;
        self.end_time = Instant::now();
        self.duration = start_time.elapsed();
    }
}

/// A sequential phase of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Runs the step, recording counters and status in `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())` when the step reached `StepStatus::Success`
    /// - `Err(BatchError::Step)` otherwise
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum RepeatStatus {
    /// The tasklet wants to be called again.
    Continuable,
    /// The tasklet has finished executing.
    Finished,
}

/// A single unit of work that does not fit the read-process-write model,
/// such as preparing a destination before items are written to it.
pub trait Tasklet {
    fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError>;
}

pub struct TaskletStep<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl Step for TaskletStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Started;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = loop {
            match self.tasklet.execute(step_execution) {
                Ok(RepeatStatus::Finished) => break Ok(()),
                Ok(RepeatStatus::Continuable) => debug!("Tasklet continuable, executing again"),
                Err(error) => break Err(error),
            }
        };

        step_execution.finish(start_time);

        match result {
            Ok(()) => {
                step_execution.status = StepStatus::Success;
                info!(
                    "End of step: {}, id: {}",
                    step_execution.name, step_execution.id
                );
                Ok(())
            }
            Err(err) => {
                step_execution.status = StepStatus::TaskletError;
                error!("Step {} failed: {}", step_execution.name, err);
                Err(BatchError::Step(format!("{}: {}", self.name, err)))
            }
        }
    }
}

/// Reads items one by one, processes them and writes them in chunks.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    reader: &'a dyn ItemReader<I>,
    processor: &'a dyn ItemProcessor<I, O>,
    writer: &'a dyn ItemWriter<O>,
    /// Number of items handed to the writer at once
    chunk_size: usize,
    /// Number of errors tolerated before the step fails
    skip_limit: usize,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Started;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let mut result = self.writer.open();
        if result.is_err() {
            step_execution.status = StepStatus::WriteError;
        } else {
            result = self.run_chunks(step_execution);
        }

        // The writer is closed even after a failure so that what was written is kept.
        if let Err(close_error) = self.writer.close() {
            if result.is_ok() {
                step_execution.status = StepStatus::WriteError;
                result = Err(close_error);
            } else {
                warn!("Error closing writer after failure: {}", close_error);
            }
        }

        step_execution.finish(start_time);

        match result {
            Ok(()) => {
                step_execution.status = StepStatus::Success;
                info!(
                    "End of step: {}, id: {}, read: {}, filtered: {}, written: {}",
                    step_execution.name,
                    step_execution.id,
                    step_execution.read_count,
                    step_execution.filter_count,
                    step_execution.write_count
                );
                Ok(())
            }
            Err(err) => {
                error!("Step {} failed: {}", step_execution.name, err);
                Err(BatchError::Step(format!("{}: {}", self.name, err)))
            }
        }
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn run_chunks(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        loop {
            let (read_items, chunk_status) = self.read_chunk(step_execution)?;
            let processed_items = self.process_chunk(step_execution, &read_items)?;
            self.write_chunk(step_execution, &processed_items)?;

            if chunk_status == ChunkStatus::Finished {
                return Ok(());
            }
        }
    }

    fn is_skip_limit_reached(&self, step_execution: &StepExecution) -> bool {
        step_execution.read_error_count
            + step_execution.process_error_count
            + step_execution.write_error_count
            > self.skip_limit
    }

    fn read_chunk(
        &self,
        step_execution: &mut StepExecution,
    ) -> Result<(Vec<I>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");

        let mut read_items = Vec::with_capacity(self.chunk_size);

        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    read_items.push(item);
                    step_execution.read_count += 1;

                    if read_items.len() >= self.chunk_size {
                        debug!("End reading chunk: FULL");
                        return Ok((read_items, ChunkStatus::Full));
                    }
                }
                Ok(None) => {
                    debug!("End reading chunk: FINISHED");
                    return Ok((read_items, ChunkStatus::Finished));
                }
                Err(error) => {
                    warn!("Error reading item: {}", error);
                    step_execution.read_error_count += 1;

                    if self.is_skip_limit_reached(step_execution) {
                        step_execution.status = StepStatus::ReadError;
                        return Err(error);
                    }
                }
            }
        }
    }

    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        read_items: &[I],
    ) -> Result<Vec<O>, BatchError> {
        debug!("Processing chunk of {} items", read_items.len());

        let mut processed_items = Vec::with_capacity(read_items.len());

        for item in read_items {
            match self.processor.process(item) {
                Ok(Some(processed_item)) => processed_items.push(processed_item),
                Ok(None) => step_execution.filter_count += 1,
                Err(error) => {
                    warn!("Error processing item: {}", error);
                    step_execution.process_error_count += 1;

                    if self.is_skip_limit_reached(step_execution) {
                        step_execution.status = StepStatus::ProcessorError;
                        return Err(error);
                    }
                }
            }
        }

        Ok(processed_items)
    }

    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        if processed_items.is_empty() {
            return Ok(());
        }

        debug!("Writing chunk of {} items", processed_items.len());

        match self
            .writer
            .write(processed_items)
            .and_then(|()| self.writer.flush())
        {
            Ok(()) => {
                step_execution.write_count += processed_items.len();
                Ok(())
            }
            Err(error) => {
                warn!("Error writing chunk: {}", error);
                step_execution.write_error_count += processed_items.len();

                if self.is_skip_limit_reached(step_execution) {
                    step_execution.status = StepStatus::WriteError;
                    Err(error)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Entry point for building either kind of step.
///
/// # Examples
///
/// ```
/// use address_import::core::item::{ItemProcessor, ItemProcessorResult, ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult};
/// use address_import::core::step::{Step, StepBuilder, StepExecution};
/// use std::cell::RefCell;
///
/// struct Numbers(RefCell<Vec<u32>>);
/// impl ItemReader<u32> for Numbers {
///     fn read(&self) -> ItemReaderResult<u32> {
///         Ok(self.0.borrow_mut().pop())
///     }
/// }
///
/// struct Even;
/// impl ItemProcessor<u32, u32> for Even {
///     fn process(&self, item: &u32) -> ItemProcessorResult<u32> {
///         Ok((item % 2 == 0).then_some(*item))
///     }
/// }
///
/// struct Sink(RefCell<Vec<u32>>);
/// impl ItemWriter<u32> for Sink {
///     fn write(&self, items: &[u32]) -> ItemWriterResult {
///         self.0.borrow_mut().extend_from_slice(items);
///         Ok(())
///     }
/// }
///
/// let reader = Numbers(RefCell::new(vec![1, 2, 3, 4]));
/// let writer = Sink(RefCell::new(Vec::new()));
///
/// let step = StepBuilder::new("evens")
///     .chunk::<u32, u32>(2)
///     .reader(&reader)
///     .processor(&Even)
///     .writer(&writer)
///     .build()
///     .unwrap();
///
/// let mut execution = StepExecution::new("evens");
/// step.execute(&mut execution).unwrap();
///
/// assert_eq!(execution.read_count, 4);
/// assert_eq!(execution.filter_count, 2);
/// assert_eq!(writer.0.into_inner(), vec![4, 2]);
/// ```
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    pub fn tasklet(self, tasklet: &dyn Tasklet) -> TaskletStepBuilder<'_> {
        TaskletStepBuilder {
            name: self.name,
            tasklet,
        }
    }

    pub fn chunk<'a, I, O>(self, chunk_size: usize) -> ChunkOrientedStepBuilder<'a, I, O> {
        ChunkOrientedStepBuilder {
            name: self.name,
            reader: None,
            processor: None,
            writer: None,
            chunk_size,
            skip_limit: 0,
        }
    }
}

pub struct TaskletStepBuilder<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl<'a> TaskletStepBuilder<'a> {
    pub fn build(self) -> TaskletStep<'a> {
        TaskletStep {
            name: self.name,
            tasklet: self.tasklet,
        }
    }
}

pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
    skip_limit: usize,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O> {
    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Number of errors tolerated before the step fails (default: 0).
    pub fn skip_limit(mut self, skip_limit: usize) -> Self {
        self.skip_limit = skip_limit;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(format!(
                "step {}: chunk size must be greater than 0",
                self.name
            )));
        }

        let missing = |component: &str| {
            BatchError::Configuration(format!("step {}: {} is required", self.name, component))
        };

        let reader = self.reader.ok_or_else(|| missing("reader"))?;
        let processor = self.processor.ok_or_else(|| missing("processor"))?;
        let writer = self.writer.ok_or_else(|| missing("writer"))?;

        Ok(ChunkOrientedStep {
            name: self.name,
            reader,
            processor,
            writer,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
        })
    }
}
