use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::error::GraphError;
use crate::notify::{FeedEvent, Notifier};
use crate::store::ChirpStore;
use crate::view::{TweetView, UserView};

pub mod proto {
    tonic::include_proto!("social_graph");
}

use proto::social_graph_server::SocialGraph;
use proto::{
    CreateUserRequest, Empty, FavoritesRequest, FollowReply, FollowRequest, LikeReply,
    LikeRequest, PostRequest, ReplyRequest, RetweetRequest, TimelineRequest, TweetListReply,
    TweetReply, TweetRequest, UserListReply, UserReply, UserRequest,
};

pub struct MySocialGraph {
    pub store: Arc<ChirpStore>,
    notifier: Arc<dyn Notifier>,
}

impl Clone for MySocialGraph {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl MySocialGraph {
    pub fn new(store: Arc<ChirpStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Fire-and-forget delivery on a separate task. The triggering
    /// mutation has already committed by the time this runs.
    fn notify(&self, event: FeedEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&event) {
                tracing::warn!("notification delivery failed: {e}");
            }
        });
    }
}

fn to_status(err: GraphError) -> Status {
    match err {
        GraphError::UserNotFound(_) | GraphError::TweetNotFound(_) => {
            Status::not_found(err.to_string())
        }
        GraphError::SelfFollow | GraphError::InvalidReference(_) => {
            Status::invalid_argument(err.to_string())
        }
        GraphError::AlreadyExists(_) => Status::already_exists(err.to_string()),
    }
}

fn user_msg(view: UserView) -> proto::User {
    proto::User {
        id: view.id,
        username: view.username,
        email: view.email,
        follower_count: view.follower_count,
        followed_count: view.followed_count,
    }
}

fn tweet_msg(view: TweetView) -> proto::Tweet {
    proto::Tweet {
        id: view.id,
        text: view.text,
        timestamp: view.timestamp.to_rfc3339(),
        user: Some(user_msg(view.user)),
        reply_count: view.reply_count,
        like_count: view.like_count,
        is_liked: view.is_liked,
        in_reply_to_status: view.in_reply_to_status.map(|v| Box::new(tweet_msg(*v))),
        retweet_status: view.retweet_status.map(|v| Box::new(tweet_msg(*v))),
    }
}

impl MySocialGraph {
    fn tweet_reply(&self, id: u64, viewer: Option<u64>) -> Result<Response<TweetReply>, Status> {
        let view = self.store.project_tweet(id, viewer).map_err(to_status)?;
        Ok(Response::new(TweetReply {
            tweet: Some(tweet_msg(view)),
        }))
    }
}

#[tonic::async_trait]
impl SocialGraph for MySocialGraph {
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<UserReply>, Status> {
        let req = request.into_inner();
        let user = self
            .store
            .create_user(&req.username, &req.email)
            .map_err(to_status)?;
        Ok(Response::new(UserReply {
            user: Some(user_msg(UserView::from(&user))),
        }))
    }

    async fn get_user(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<UserReply>, Status> {
        let req = request.into_inner();
        let view = self.store.project_user(req.user_id).map_err(to_status)?;
        Ok(Response::new(UserReply {
            user: Some(user_msg(view)),
        }))
    }

    async fn list_users(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<UserListReply>, Status> {
        let users = self
            .store
            .list_users()
            .iter()
            .map(|u| user_msg(UserView::from(u)))
            .collect();
        Ok(Response::new(UserListReply { users }))
    }

    async fn follow(
        &self,
        request: Request<FollowRequest>,
    ) -> Result<Response<FollowReply>, Status> {
        let req = request.into_inner();
        let changed = self
            .store
            .follow(req.follower_id, req.followed_id)
            .map_err(to_status)?;
        if changed {
            self.notify(FeedEvent::Followed {
                follower: req.follower_id,
                followed: req.followed_id,
            });
        }
        Ok(Response::new(FollowReply { changed }))
    }

    async fn unfollow(
        &self,
        request: Request<FollowRequest>,
    ) -> Result<Response<FollowReply>, Status> {
        let req = request.into_inner();
        let changed = self.store.unfollow(req.follower_id, req.followed_id);
        Ok(Response::new(FollowReply { changed }))
    }

    async fn list_followers(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<UserListReply>, Status> {
        let req = request.into_inner();
        let users = self
            .store
            .list_followers(req.user_id)
            .map_err(to_status)?
            .iter()
            .map(|u| user_msg(UserView::from(u)))
            .collect();
        Ok(Response::new(UserListReply { users }))
    }

    async fn list_followed(
        &self,
        request: Request<UserRequest>,
    ) -> Result<Response<UserListReply>, Status> {
        let req = request.into_inner();
        let users = self
            .store
            .list_followed(req.user_id)
            .map_err(to_status)?
            .iter()
            .map(|u| user_msg(UserView::from(u)))
            .collect();
        Ok(Response::new(UserListReply { users }))
    }

    async fn post(&self, request: Request<PostRequest>) -> Result<Response<TweetReply>, Status> {
        let req = request.into_inner();
        let tweet = self.store.post(req.author_id, &req.text).map_err(to_status)?;
        self.tweet_reply(tweet.id, Some(req.author_id))
    }

    async fn reply(&self, request: Request<ReplyRequest>) -> Result<Response<TweetReply>, Status> {
        let req = request.into_inner();
        let tweet = self
            .store
            .reply(req.author_id, &req.text, req.parent_id)
            .map_err(to_status)?;
        if let Ok(parent) = self.store.get_tweet(req.parent_id) {
            self.notify(FeedEvent::RepliedTo {
                parent_author: parent.author_id,
                reply: tweet.id,
            });
        }
        self.tweet_reply(tweet.id, Some(req.author_id))
    }

    async fn retweet(
        &self,
        request: Request<RetweetRequest>,
    ) -> Result<Response<TweetReply>, Status> {
        let req = request.into_inner();
        let tweet = self
            .store
            .retweet(req.author_id, req.text.as_deref(), req.source_id)
            .map_err(to_status)?;
        self.tweet_reply(tweet.id, Some(req.author_id))
    }

    async fn get_tweet(
        &self,
        request: Request<TweetRequest>,
    ) -> Result<Response<TweetReply>, Status> {
        let req = request.into_inner();
        self.tweet_reply(req.tweet_id, req.viewer_id)
    }

    async fn list_replies(
        &self,
        request: Request<TweetRequest>,
    ) -> Result<Response<TweetListReply>, Status> {
        let req = request.into_inner();
        let replies = self.store.list_replies(req.tweet_id).map_err(to_status)?;
        let tweets = self
            .store
            .project_tweets(&replies, req.viewer_id)
            .into_iter()
            .map(tweet_msg)
            .collect();
        Ok(Response::new(TweetListReply { tweets }))
    }

    async fn like(&self, request: Request<LikeRequest>) -> Result<Response<LikeReply>, Status> {
        let req = request.into_inner();
        let changed = self
            .store
            .like(req.user_id, req.tweet_id)
            .map_err(to_status)?;
        if changed {
            self.notify(FeedEvent::Liked {
                user: req.user_id,
                tweet: req.tweet_id,
            });
        }
        Ok(Response::new(LikeReply { changed }))
    }

    async fn unlike(&self, request: Request<LikeRequest>) -> Result<Response<LikeReply>, Status> {
        let req = request.into_inner();
        let changed = self.store.unlike(req.user_id, req.tweet_id);
        Ok(Response::new(LikeReply { changed }))
    }

    async fn list_favorites(
        &self,
        request: Request<FavoritesRequest>,
    ) -> Result<Response<TweetListReply>, Status> {
        let req = request.into_inner();
        let marked = self
            .store
            .list_favorites_of(req.user_id)
            .map_err(to_status)?;
        let tweets = self
            .store
            .project_tweets(&marked, req.viewer_id)
            .into_iter()
            .map(tweet_msg)
            .collect();
        Ok(Response::new(TweetListReply { tweets }))
    }

    async fn home_timeline(
        &self,
        request: Request<TimelineRequest>,
    ) -> Result<Response<TweetListReply>, Status> {
        let req = request.into_inner();
        let feed = self.store.home_timeline(req.user_id).map_err(to_status)?;
        let tweets = self
            .store
            .project_tweets(&feed, Some(req.user_id))
            .into_iter()
            .map(tweet_msg)
            .collect();
        Ok(Response::new(TweetListReply { tweets }))
    }
}
