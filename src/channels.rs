use async_trait::async_trait;

#[async_trait]
pub trait ReceiverWrapper<T>
where
    T: Send,
{
    async fn receive(&mut self) -> Option<T>;
}

#[async_trait]
impl<T> ReceiverWrapper<T> for tokio::sync::mpsc::UnboundedReceiver<T>
where
    T: Send,
{
    async fn receive(&mut self) -> Option<T> {
        self.recv().await
    }
}

#[cfg(test)]
pub struct FakeChannelReceiver<T> {
    pub faked_messages: std::collections::VecDeque<T>,
    pub receive_count: usize,
}

#[cfg(test)]
impl<T> FakeChannelReceiver<T> {
    pub fn new(messages: Vec<T>) -> Self {
        FakeChannelReceiver {
            faked_messages: messages.into_iter().collect(),
            receive_count: 0,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<T> ReceiverWrapper<T> for FakeChannelReceiver<T>
where
    T: Send,
{
    async fn receive(&mut self) -> Option<T> {
        self.receive_count += 1;
        self.faked_messages.pop_front()
    }
}
