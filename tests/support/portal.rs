//! Builders for the portal pages the crawler visits, in the portal's markup
//! shape (class names and nesting only).

use super::fake_browser::Node;

/// Course list: one `.coursebox` per `(name, href)`.
pub fn front_page<S: AsRef<str>>(courses: &[(&str, S)]) -> Node {
    Node::new("html").children(courses.iter().map(|(name, href)| {
        Node::new("div")
            .class("coursebox clearfix")
            .child(Node::new("a").attr("href", href.as_ref()).text(name))
    }))
}

/// Course page with every section inline.
pub fn unique_course(sections: Vec<(&str, Vec<Node>)>) -> Node {
    let sections = sections.into_iter().map(|(title, activities)| {
        let mut content = Node::new("div").class("content").child(
            Node::new("h3")
                .class("sectionname")
                .child(Node::new("a").attr("href", "#section").text(title)),
        );
        if !activities.is_empty() {
            content = content.child(Node::new("ul").class("section img-text").children(activities));
        }
        Node::new("li").class("section main clearfix").child(content)
    });
    Node::new("html").child(Node::new("ul").class("topics").children(sections))
}

/// Course page whose sections each live on their own page.
pub fn multi_course<S: AsRef<str>>(section_links: &[S]) -> Node {
    let sections = section_links.iter().map(|href| {
        Node::new("li").class("section main").child(
            Node::new("a")
                .class("section-go-link")
                .attr("href", href.as_ref())
                .text("Go to section"),
        )
    });
    Node::new("html").child(Node::new("ul").class("topics").children(sections))
}

/// Page of a single section.
pub fn section_page(title: &str, activities: Vec<Node>) -> Node {
    Node::new("html").child(
        Node::new("div")
            .class("single-section")
            .child(Node::new("h3").class("sectionname").text(title))
            .child(Node::new("ul").class("section img-text").children(activities)),
    )
}

fn activity(kind: &str, href: &str, label: &str) -> Node {
    Node::new("li")
        .class(&format!("activity {kind} modtype_{kind}"))
        .child(
            Node::new("div").class("activityinstance").child(
                Node::new("a")
                    .attr("href", href)
                    .attr("onclick", "window.open(this.href); return false;")
                    .text(label),
            ),
        )
}

pub fn resource(href: &str) -> Node {
    activity("resource", href, "Resource")
}

pub fn folder(href: &str) -> Node {
    activity("folder", href, "Folder")
}

pub fn assignment(href: &str) -> Node {
    activity("assign", href, "Assignment")
}

pub fn forum(href: &str) -> Node {
    activity("forum", href, "Forum")
}

/// Folder page with its "download folder" form.
pub fn folder_page(action: &str, fields: &[(&str, &str)]) -> Node {
    let inputs = fields.iter().map(|(name, value)| {
        Node::new("input")
            .attr("type", "hidden")
            .attr("name", name)
            .attr("value", value)
    });
    let form = Node::new("form")
        .attr("method", "post")
        .attr("action", action)
        .children(inputs)
        .child(Node::new("input").attr("type", "submit").attr("value", "Download folder"));
    Node::new("html").child(Node::new("div").class("singlebutton").child(form))
}

/// Assignment page with one results table of links.
pub fn assignment_page<S: AsRef<str>>(links: &[S]) -> Node {
    let rows = links.iter().map(|href| {
        Node::new("tr").child(
            Node::new("td").child(Node::new("a").attr("href", href.as_ref()).text("file")),
        )
    });
    Node::new("html").child(Node::new("table").class("generaltable").children(rows))
}

/// Resource landing page wrapping the real link.
pub fn resource_workaround(href: &str) -> Node {
    Node::new("html").child(
        Node::new("div")
            .class("resourceworkaround")
            .child(Node::new("a").attr("href", href).text("Click here")),
    )
}

/// Resource landing page showing the file as an inline image.
pub fn resource_image(src: &str) -> Node {
    Node::new("html").child(
        Node::new("div")
            .class("resourcecontent")
            .child(Node::new("img").class("resourceimage").attr("src", src)),
    )
}

/// Front page with the sign-in form; the button leads to `after_login`.
pub fn login_page(after_login: &str) -> Node {
    let form = Node::new("form")
        .class("fpsignup")
        .child(Node::new("input").id("username"))
        .child(Node::new("input").id("password"))
        .child(
            Node::new("div").class("sign-up-btn").child(
                Node::new("button")
                    .class("btn btn-primary")
                    .attr("data-goto", after_login),
            ),
        );
    Node::new("html").child(form)
}
