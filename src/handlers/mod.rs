use crate::{context::ReplySender, replies::Reply};

pub mod broadcast;
pub mod join;
pub mod privmsg;
pub mod quit;

/// One reply and everyone who should receive it.
#[derive(Debug)]
pub struct Delivery {
    pub recipients: Vec<ReplySender>,
    pub reply: Reply,
}

impl Delivery {
    pub fn to_one(recipient: &ReplySender, reply: Reply) -> Self {
        Delivery {
            recipients: vec![recipient.clone()],
            reply,
        }
    }
}
