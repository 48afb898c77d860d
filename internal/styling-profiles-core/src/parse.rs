use winnow::{
    combinator::{alt, delimited, fold_repeat},
    error::{ContextError, ParseError},
    stream::AsChar,
    token::{take_till, take_while},
    PResult, Parser,
};

/// ```text
///   v-----v name
/// {{primary}}
/// ^---------^ token
/// ```
#[derive(Debug, PartialEq)]
pub struct Placeholder<'s> {
    pub name: &'s str,
    pub token: &'s str,
}

#[derive(Debug, PartialEq)]
pub enum TemplateFragment<'s> {
    Text(&'s str),
    Placeholder(Placeholder<'s>),
}

pub fn parse_template(
    input: &str,
) -> Result<Vec<TemplateFragment<'_>>, ParseError<&str, ContextError>> {
    template.parse(input)
}

fn identifier<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(1.., (AsChar::is_alphanum, '_')).parse_next(input)
}

fn placeholder<'s>(input: &mut &'s str) -> PResult<Placeholder<'s>> {
    let (name, token) = delimited("{{", identifier, "}}")
        .with_recognized()
        .parse_next(input)?;
    Ok(Placeholder { name, token })
}

fn text<'s>(input: &mut &'s str) -> PResult<&'s str> {
    // A brace that doesn't open a placeholder is consumed on its own so the
    // scan can retry one character later.
    alt((take_till(1.., '{'), '{'.recognize())).parse_next(input)
}

fn template<'s>(input: &mut &'s str) -> PResult<Vec<TemplateFragment<'s>>> {
    fold_repeat(
        0..,
        alt((
            placeholder.map(TemplateFragment::Placeholder),
            text.map(TemplateFragment::Text),
        )),
        Vec::new,
        |mut acc, item| {
            acc.push(item);
            acc
        },
    )
    .parse_next(input)
}
