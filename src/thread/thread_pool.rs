use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use tracing::{trace, warn};

enum Message {
    NewJob(Job),
    Terminate,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// 取消标记，所有工作线程共享。任务开始前和量化过程中检查它。
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ThreadPool {
    workers: Vec<Worker>,
    job_sender: mpsc::Sender<Message>,
    cancel: CancelToken,
}

impl ThreadPool {
    /// 创建线程池。
    ///
    /// `size`线程池中线程的数量，为 0 时按 1 处理。
    pub fn new(size: usize) -> io::Result<ThreadPool> {
        let size = size.max(1);

        // 控制线程
        let (job_sender, job_receiver) = mpsc::channel();

        let job_receiver = Arc::new(Mutex::new(job_receiver));

        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            workers.push(Worker::new(id, Arc::clone(&job_receiver))?);
        }

        Ok(ThreadPool {
            workers,
            job_sender,
            cancel: CancelToken::default(),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // 需要在多线程中执行的闭包函数
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Box::new(f);
        // 所有工作线程都已退出时任务被丢弃，任务持有的结果通道随之断开
        if self.job_sender.send(Message::NewJob(job)).is_err() {
            warn!("thread pool has no live workers, job dropped");
        }
    }
}

/// 工作线程
#[derive(Debug)]
struct Worker {
    /// 保存创建的线程
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Message>>>) -> io::Result<Worker> {
        let thread = thread::Builder::new()
            .name(format!("encode-{id}"))
            .spawn(move || loop {
                // 锁定接收者获取任务，recv 阻塞当前线程直到有任务，拿到后立即释放锁
                let message = match receiver.lock() {
                    Ok(receiver) => receiver.recv(),
                    Err(_) => break,
                };

                match message {
                    // 工作消息执行工作
                    Ok(Message::NewJob(job)) => {
                        trace!(worker = id, "job started");
                        job();
                    }
                    // 关闭线程消息，或线程池已被释放
                    Ok(Message::Terminate) | Err(_) => break,
                }
            })?;
        Ok(Worker {
            thread: Some(thread),
        })
    }
}

impl Drop for ThreadPool {
    // 在清理数据时结束线程
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.job_sender.send(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!("encode worker panicked");
                }
            }
        }
    }
}
