use chrono::{NaiveDate, NaiveDateTime};
use tabula::{
    schema,
    stmt::{Type, Value, ValueRecord},
    Model, PrimaryKey, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Blog {
    pub blog_id: i64,
    pub url: String,
    pub rating: i64,
}

impl Blog {
    pub fn new(blog_id: i64, url: &str, rating: i64) -> Self {
        Self {
            blog_id,
            url: url.to_string(),
            rating,
        }
    }
}

impl Model for Blog {
    const NAME: &'static str = "Blog";

    fn schema() -> schema::Model {
        schema::Model::new(Self::NAME)
            .field("blog_id", Type::I64)
            .field("url", Type::String)
            .field("rating", Type::I64)
    }

    fn primary_key() -> PrimaryKey<Self> {
        PrimaryKey::<Self>::new().field("blog_id", |blog| blog.blog_id.into())
    }

    fn load(record: ValueRecord) -> Result<Self> {
        let mut fields = record.into_iter();
        Ok(Self {
            blog_id: next(&mut fields).to_i64()?,
            url: next(&mut fields).into_string()?,
            rating: next(&mut fields).to_i64()?,
        })
    }

    fn to_record(&self) -> ValueRecord {
        ValueRecord::from_vec(vec![
            self.blog_id.into(),
            (&self.url).into(),
            self.rating.into(),
        ])
    }
}

/// A post, sharded into one table per month of `post_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub post_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub blog_id: i64,
    pub post_date: NaiveDateTime,
}

impl Post {
    /// A post dated at midnight of `date` (`YYYY-MM-DD`).
    pub fn new(post_id: i64, title: &str, date: &str) -> Self {
        Self {
            post_id,
            title: title.to_string(),
            content: None,
            blog_id: 1,
            post_date: crate::day(date).and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.post_date.date()
    }
}

impl Model for Post {
    const NAME: &'static str = "Post";

    fn schema() -> schema::Model {
        schema::Model::new(Self::NAME)
            .field("post_id", Type::I64)
            .field("title", Type::String)
            .nullable_field("content", Type::String)
            .field("blog_id", Type::I64)
            .field("post_date", Type::DateTime)
    }

    fn primary_key() -> PrimaryKey<Self> {
        PrimaryKey::<Self>::new().field("post_id", |post| post.post_id.into())
    }

    fn load(record: ValueRecord) -> Result<Self> {
        let mut fields = record.into_iter();
        Ok(Self {
            post_id: next(&mut fields).to_i64()?,
            title: next(&mut fields).into_string()?,
            content: next(&mut fields).to_option(Value::into_string)?,
            blog_id: next(&mut fields).to_i64()?,
            post_date: next(&mut fields).to_date_time()?,
        })
    }

    fn to_record(&self) -> ValueRecord {
        ValueRecord::from_vec(vec![
            self.post_id.into(),
            (&self.title).into(),
            self.content.clone().into(),
            self.blog_id.into(),
            self.post_date.into(),
        ])
    }
}

/// Tags are keyed by post and label; the key order is `(post_id, label)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub post_id: i64,
    pub label: String,
}

impl Model for Tag {
    const NAME: &'static str = "Tag";

    fn schema() -> schema::Model {
        schema::Model::new(Self::NAME)
            .field("post_id", Type::I64)
            .field("label", Type::String)
            .table_name("post_tags")
    }

    fn primary_key() -> PrimaryKey<Self> {
        PrimaryKey::<Self>::new()
            .field("post_id", |tag| tag.post_id.into())
            .field("label", |tag| (&tag.label).into())
    }

    fn load(record: ValueRecord) -> Result<Self> {
        let mut fields = record.into_iter();
        Ok(Self {
            post_id: next(&mut fields).to_i64()?,
            label: next(&mut fields).into_string()?,
        })
    }

    fn to_record(&self) -> ValueRecord {
        ValueRecord::from_vec(vec![self.post_id.into(), (&self.label).into()])
    }
}

/// Never registered with a `Db`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub comment_id: i64,
}

impl Model for Comment {
    const NAME: &'static str = "Comment";

    fn schema() -> schema::Model {
        schema::Model::new(Self::NAME).field("comment_id", Type::I64)
    }

    fn primary_key() -> PrimaryKey<Self> {
        PrimaryKey::<Self>::new().field("comment_id", |comment| comment.comment_id.into())
    }

    fn load(record: ValueRecord) -> Result<Self> {
        let mut fields = record.into_iter();
        Ok(Self {
            comment_id: next(&mut fields).to_i64()?,
        })
    }

    fn to_record(&self) -> ValueRecord {
        ValueRecord::from_vec(vec![self.comment_id.into()])
    }
}

fn next(fields: &mut impl Iterator<Item = Value>) -> Value {
    fields.next().unwrap_or_default()
}
